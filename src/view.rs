//! Typed views over foreign arrays (NumPy <-> ndarray)
//!
//! # Inbound
//! [`to_view`] turns an [`NdArray`] into a [`TypedView<T, D>`]:
//! - **Zero-copy**: when the dtype is equivalent to `T`, the view aliases the
//!   NumPy buffer. Byte strides are divided exactly by `size_of::<T>()` and
//!   negative strides are handled by inverting the axis on the ndarray side.
//! - **Cast-and-copy**: otherwise NumPy casts into a new buffer (subject to the
//!   [`CastPolicy`]) and the view aliases that buffer instead.
//!
//! Either way the view owns a handle to the buffer it reads, so it can never
//! outlive it.
//!
//! # Outbound
//! [`from_array`] allocates a new NumPy array and copies an ndarray value into
//! it in logical (row-major) order.
//!
//! Author: ndbridge contributors

use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

use ndarray::{
    Array, ArrayBase, ArrayView, ArrayViewMut, Axis, Data, Dimension, IxDyn, RawData,
    ShapeBuilder,
};
use numpy::{
    PyArrayDescrMethods, PyArrayDyn, PyArrayMethods, PyReadwriteArray, PyUntypedArrayMethods,
};
use pyo3::prelude::*;

use crate::config::CastPolicy;
use crate::dtype::{can_cast_dtype_safely, Scalar};
use crate::error::{BridgeError, BridgeResult};
use crate::handle::NdArray;

/// Extents, element strides and base offset of a strided buffer, in the
/// form ndarray accepts (non-negative strides plus a set of inverted axes).
#[derive(Clone, Debug, PartialEq, Eq)]
struct ElementLayout<D> {
    dim: D,
    strides: D,
    /// Byte offset from NumPy's data pointer to the lowest-addressed element
    offset: isize,
    /// Bit `i` set when axis `i` had a negative stride
    inverted: u64,
}

impl<D: Dimension> ElementLayout<D> {
    fn new(shape: &[usize], byte_strides: &[isize], itemsize: usize) -> BridgeResult<Self> {
        check_rank::<D>(shape.len())?;
        debug_assert_eq!(shape.len(), byte_strides.len());

        let mut dim = D::zeros(shape.len());
        let mut strides = D::zeros(shape.len());
        let mut offset = 0_isize;
        let mut inverted = 0_u64;
        let size = itemsize as isize;

        for (axis, (&extent, &stride)) in shape.iter().zip(byte_strides).enumerate() {
            dim[axis] = extent;
            // Never traversed; NumPy does not keep these strides meaningful
            if extent <= 1 {
                continue;
            }
            if stride % size != 0 {
                return Err(BridgeError::LayoutViolation {
                    axis,
                    stride,
                    itemsize,
                });
            }
            if stride < 0 {
                offset += stride * (extent as isize - 1);
                inverted |= 1 << axis;
            }
            strides[axis] = (stride / size).unsigned_abs();
        }

        Ok(Self {
            dim,
            strides,
            offset,
            inverted,
        })
    }

    /// First axis whose elements share one address, if any
    fn overlapping_axis(&self) -> Option<usize> {
        self.dim
            .slice()
            .iter()
            .zip(self.strides.slice())
            .position(|(&extent, &stride)| extent > 1 && stride == 0)
    }

    fn restore_axes<S: RawData>(&self, array: &mut ArrayBase<S, D>) {
        let mut inverted = self.inverted;
        while inverted != 0 {
            let axis = inverted.trailing_zeros() as usize;
            inverted &= !(1 << axis);
            array.invert_axis(Axis(axis));
        }
    }
}

fn check_rank<D: Dimension>(actual: usize) -> BridgeResult<()> {
    match D::NDIM {
        Some(expected) if expected != actual => Err(BridgeError::RankMismatch { expected, actual }),
        _ => Ok(()),
    }
}

/// Statically-typed, fixed-rank view over a NumPy buffer.
///
/// Holds a reference to the array it reads from: either the caller's array
/// (zero-copy) or the private result of a cast.
#[derive(Debug)]
pub struct TypedView<T, D> {
    handle: NdArray,
    base: *mut T,
    layout: ElementLayout<D>,
    copied: bool,
}

/// Exclusive, writeable view returned by [`TypedView::view_mut`].
///
/// Holds NumPy's dynamic borrow on the buffer until dropped, so no other
/// mutable view of the same memory can be taken meanwhile.
pub struct TypedViewMut<'a, T: Scalar, D: Dimension> {
    view: ArrayViewMut<'a, T, D>,
    _borrow: PyReadwriteArray<'a, T, IxDyn>,
}

impl<'a, T: Scalar, D: Dimension> Deref for TypedViewMut<'a, T, D> {
    type Target = ArrayViewMut<'a, T, D>;

    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl<T: Scalar, D: Dimension> DerefMut for TypedViewMut<'_, T, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.view
    }
}

impl<T: Scalar, D: Dimension> fmt::Debug for TypedViewMut<'_, T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedViewMut")
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl<T: Scalar, D: Dimension> TypedView<T, D> {
    fn over(py: Python<'_>, handle: NdArray, layout: ElementLayout<D>, copied: bool) -> Self {
        // SAFETY: `offset` is the distance from the first element to the
        // lowest-addressed one, which lies inside the buffer `handle` keeps alive.
        let base = unsafe { (handle.data(py) as *mut u8).offset(layout.offset) as *mut T };
        Self {
            handle,
            base,
            layout,
            copied,
        }
    }

    /// Read-only ndarray view of the elements
    pub fn view(&self) -> ArrayView<'_, T, D> {
        let shape = self.layout.dim.clone().strides(self.layout.strides.clone());
        // SAFETY: `base` and the non-negative element strides describe exactly
        // the elements of the NumPy buffer, which stays alive as long as
        // `self.handle`; the returned view borrows `self`.
        let mut view = unsafe { ArrayView::from_shape_ptr(shape, self.base as *const T) };
        self.layout.restore_axes(&mut view);
        view
    }

    /// Mutable ndarray view of the elements.
    ///
    /// On the zero-copy path, writes land in the caller's NumPy array. The
    /// writeable flag is read from NumPy on every call. Fails with
    /// [`BridgeError::AlreadyBorrowed`] while another mutable view of the same
    /// buffer is alive, and with [`BridgeError::SelfOverlap`] when a
    /// zero-stride axis makes distinct indices share an element.
    pub fn view_mut<'a>(&'a mut self, py: Python<'a>) -> BridgeResult<TypedViewMut<'a, T, D>> {
        if !self.handle.is_writeable(py) {
            return Err(BridgeError::ReadOnly);
        }
        if let Some(axis) = self.layout.overlapping_axis() {
            return Err(BridgeError::SelfOverlap { axis });
        }

        let array = self.handle.bind(py).ok_or_else(|| BridgeError::NotAnArray {
            type_name: "NoneType".to_string(),
        })?;
        let borrow = array
            .downcast::<PyArrayDyn<T>>()
            .map_err(|_| BridgeError::UnsupportedElementType(array.dtype().to_string()))?
            .try_readwrite()
            .map_err(|_| BridgeError::AlreadyBorrowed)?;

        let shape = self.layout.dim.clone().strides(self.layout.strides.clone());
        // SAFETY: as in `view`; NumPy marked the buffer writeable, no axis
        // aliases elements, and `borrow` excludes every other mutable view of
        // this buffer for as long as the returned value lives.
        let mut view = unsafe { ArrayViewMut::from_shape_ptr(shape, self.base) };
        self.layout.restore_axes(&mut view);
        Ok(TypedViewMut {
            view,
            _borrow: borrow,
        })
    }

    /// Copy the elements into an owned, standard-layout array
    pub fn to_owned(&self) -> Array<T, D> {
        self.view().to_owned()
    }

    /// Pointer to the first element in logical order
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.view().as_ptr()
    }

    /// Extent of each axis
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.dim.slice()
    }

    /// Whether the elements were produced by a cast rather than aliased
    #[inline]
    pub fn is_copy(&self) -> bool {
        self.copied
    }

    /// Handle to the buffer backing this view
    #[inline]
    pub fn handle(&self) -> &NdArray {
        &self.handle
    }

    /// Drop the view, keeping the handle to its buffer
    pub fn into_handle(self) -> NdArray {
        self.handle
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// View `handle` as a rank-`D` array of `T`, casting if needed.
///
/// Shorthand for [`to_view_with`] with the default [`CastPolicy`].
#[inline]
pub fn to_view<T: Scalar, D: Dimension>(
    py: Python<'_>,
    handle: &NdArray,
) -> BridgeResult<TypedView<T, D>> {
    to_view_with(py, handle, CastPolicy::default())
}

/// View `handle` as a rank-`D` array of `T`.
///
/// The rank is checked before anything else so a wrong-rank array never
/// costs a cast. Equivalent dtypes give a zero-copy view; otherwise `policy`
/// decides whether NumPy may cast into a new buffer.
pub fn to_view_with<T: Scalar, D: Dimension>(
    py: Python<'_>,
    handle: &NdArray,
    policy: CastPolicy,
) -> BridgeResult<TypedView<T, D>> {
    if handle.is_none() {
        return Err(BridgeError::NotAnArray {
            type_name: "NoneType".to_string(),
        });
    }
    check_rank::<D>(handle.ndim(py))?;

    let source = handle.dtype(py)?;
    let target = T::get_dtype(py);
    let itemsize = mem::size_of::<T>();

    if source.is_equiv_to(&target) {
        let layout = ElementLayout::new(handle.shape(py), handle.strides(py), itemsize)?;
        if handle.data(py) as usize % mem::align_of::<T>() == 0 {
            log::trace!("zero-copy {target} view of shape {:?}", handle.shape(py));
            return Ok(TypedView::over(py, handle.clone_ref(py), layout, false));
        }
        log::debug!("{target} buffer is not aligned, copying");
    } else {
        let allowed = match policy {
            CastPolicy::Unsafe => true,
            CastPolicy::Safe => can_cast_dtype_safely(py, &source, &target),
            CastPolicy::Never => false,
        };
        if !allowed {
            log::debug!("{policy} policy rejected cast from {source} to {target}");
            return Err(BridgeError::UnsafeCast {
                from: source.to_string(),
                to: target.to_string(),
                policy: policy.name(),
            });
        }
        log::debug!("casting {source} array to {target}");
    }

    let cast = handle.cast_to_dtype(py, &target)?;
    let layout = ElementLayout::new(cast.shape(py), cast.strides(py), itemsize)?;
    Ok(TypedView::over(py, cast, layout, true))
}

// ============================================================================
// Outbound
// ============================================================================

/// Copy an ndarray value into a newly allocated NumPy array.
///
/// Elements are visited in logical order, whatever the source's memory
/// layout, and written to a C-contiguous buffer of the same shape.
pub fn from_array<T, S, D>(py: Python<'_>, array: &ArrayBase<S, D>) -> NdArray
where
    T: Scalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    let handle = NdArray::allocate(py, T::ELEMENT_TYPE, array.shape());
    let len = handle.len(py);
    assert_eq!(
        len,
        array.len(),
        "allocated array does not match the source element count"
    );

    // SAFETY: `handle` owns the only reference to a fresh, aligned,
    // C-contiguous buffer of exactly `len` elements of `T`.
    let dst = unsafe { std::slice::from_raw_parts_mut(handle.data(py) as *mut T, len) };
    for (dst, src) in dst.iter_mut().zip(array.iter()) {
        *dst = *src;
    }
    handle
}
