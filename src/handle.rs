//! Reference-counted handle over a NumPy array
//!
//! [`NdArray`] owns exactly one strong Python reference to a `numpy.ndarray`
//! (or to nothing, for the `None` sentinel). Cloning takes another reference
//! and dropping releases it, so any number of handles may share one buffer;
//! NumPy frees the memory when the last reference goes away.
//!
//! All metadata accessors read NumPy's own array header; nothing is cached.
//!
//! Author: ndbridge contributors

use std::ffi::c_void;
use std::ptr;

use numpy::npyffi::NPY_ARRAY_WRITEABLE;
use numpy::{
    PyArrayDescr, PyArrayDescrMethods, PyArrayDyn, PyArrayMethods, PyUntypedArray,
    PyUntypedArrayMethods,
};
use pyo3::prelude::*;

use crate::dtype::{ElementType, Scalar, ScalarVisitor};
use crate::error::{BridgeError, BridgeResult};

/// Shared handle to a foreign NumPy array, or the `None` sentinel
#[derive(Debug)]
pub struct NdArray {
    obj: Option<Py<PyUntypedArray>>,
}

impl NdArray {
    /// Wrap a Python value, taking a new strong reference.
    ///
    /// Accepts any `numpy.ndarray` (including one already wrapped elsewhere)
    /// and `None`. Anything else is rejected with [`BridgeError::NotAnArray`]
    /// before a reference is taken.
    pub fn wrap(obj: &Bound<'_, PyAny>) -> BridgeResult<Self> {
        if obj.is_none() {
            return Ok(Self::none());
        }
        match obj.downcast::<PyUntypedArray>() {
            Ok(array) => Ok(Self {
                obj: Some(array.clone().unbind()),
            }),
            Err(_) => Err(BridgeError::NotAnArray {
                type_name: type_name(obj),
            }),
        }
    }

    /// The "no value" sentinel
    pub const fn none() -> Self {
        Self { obj: None }
    }

    /// Whether this handle is the `None` sentinel
    #[inline]
    pub fn is_none(&self) -> bool {
        self.obj.is_none()
    }

    /// Allocate a new C-contiguous, zero-filled array.
    ///
    /// The returned handle holds the only reference.
    pub fn allocate(py: Python<'_>, elem: ElementType, shape: &[usize]) -> Self {
        let array = elem.visit(Zeros { py, shape });
        log::trace!("allocated {elem} array of shape {shape:?}");
        Self {
            obj: Some(array.unbind()),
        }
    }

    /// Take another reference to the same array
    #[inline]
    pub fn clone_ref(&self, py: Python<'_>) -> Self {
        Self {
            obj: self.obj.as_ref().map(|obj| obj.clone_ref(py)),
        }
    }

    /// Point this handle at `other`'s array.
    ///
    /// The incoming reference is taken before the outgoing one is released,
    /// so assigning a handle to itself (or to an alias) is sound.
    pub fn assign_from(&mut self, py: Python<'_>, other: &NdArray) {
        let incoming = other.clone_ref(py);
        let outgoing = std::mem::replace(self, incoming);
        drop(outgoing);
    }

    /// Borrow the underlying array, `None` for the sentinel
    #[inline]
    pub fn bind<'a, 'py>(&'a self, py: Python<'py>) -> Option<&'a Bound<'py, PyUntypedArray>> {
        self.obj.as_ref().map(|obj| obj.bind(py))
    }

    /// Convert into a Python object, handing over this handle's reference
    pub fn into_bound<'py>(self, py: Python<'py>) -> Bound<'py, PyAny> {
        match self.obj {
            Some(obj) => obj.into_bound(py).into_any(),
            None => py.None().into_bound(py),
        }
    }

    /// Whether both handles refer to the same Python object
    pub fn is(&self, other: &NdArray) -> bool {
        match (&self.obj, &other.obj) {
            (Some(a), Some(b)) => a.as_ptr() == b.as_ptr(),
            (None, None) => true,
            _ => false,
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Number of axes (0 for the sentinel)
    #[inline]
    pub fn ndim(&self, py: Python<'_>) -> usize {
        self.bind(py).map_or(0, |a| a.ndim())
    }

    /// Total number of elements
    #[inline]
    pub fn len(&self, py: Python<'_>) -> usize {
        self.bind(py).map_or(0, |a| a.len())
    }

    /// Whether the array has no elements
    #[inline]
    pub fn is_empty(&self, py: Python<'_>) -> bool {
        self.len(py) == 0
    }

    /// Extent of each axis
    #[inline]
    pub fn shape<'a>(&'a self, py: Python<'a>) -> &'a [usize] {
        match self.bind(py) {
            Some(a) => a.shape(),
            None => &[],
        }
    }

    /// Byte stride of each axis, exactly as NumPy reports it
    #[inline]
    pub fn strides<'a>(&'a self, py: Python<'a>) -> &'a [isize] {
        match self.bind(py) {
            Some(a) => a.strides(),
            None => &[],
        }
    }

    /// Size in bytes of one element
    #[inline]
    pub fn itemsize(&self, py: Python<'_>) -> usize {
        self.bind(py).map_or(0, |a| a.dtype().itemsize())
    }

    /// NumPy descriptor of the elements
    pub fn dtype<'py>(&self, py: Python<'py>) -> BridgeResult<Bound<'py, PyArrayDescr>> {
        self.bind(py)
            .map(|a| a.dtype())
            .ok_or_else(|| self.not_an_array(py))
    }

    /// Registry tag of the elements
    pub fn element_type(&self, py: Python<'_>) -> BridgeResult<ElementType> {
        let dtype = self.dtype(py)?;
        ElementType::from_dtype(&dtype)
            .ok_or_else(|| BridgeError::UnsupportedElementType(dtype.to_string()))
    }

    /// Pointer to the first element (null for the sentinel)
    #[inline]
    pub fn data(&self, py: Python<'_>) -> *const c_void {
        match self.bind(py) {
            // SAFETY: `as_array_ptr` points at a live PyArrayObject kept alive
            // by `self`; reading the `data` field does not touch the buffer.
            Some(a) => unsafe { (*a.as_array_ptr()).data as *const c_void },
            None => ptr::null(),
        }
    }

    /// Whether NumPy allows writing through this array
    pub fn is_writeable(&self, py: Python<'_>) -> bool {
        match self.bind(py) {
            // SAFETY: see `data`
            Some(a) => unsafe { (*a.as_array_ptr()).flags & NPY_ARRAY_WRITEABLE != 0 },
            None => false,
        }
    }

    /// Whether the buffer is laid out in C order without gaps
    #[inline]
    pub fn is_c_contiguous(&self, py: Python<'_>) -> bool {
        self.bind(py).is_some_and(|a| a.is_c_contiguous())
    }

    /// Python reference count of the wrapped object (0 for the sentinel)
    pub fn refcount(&self, py: Python<'_>) -> isize {
        self.bind(py).map_or(0, |a| a.get_refcnt())
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Cast into a newly allocated array of `elem`, using NumPy's `astype`.
    ///
    /// The source buffer is never modified.
    pub fn cast_to(&self, py: Python<'_>, elem: ElementType) -> BridgeResult<NdArray> {
        self.cast_to_dtype(py, &elem.dtype(py))
    }

    pub(crate) fn cast_to_dtype(
        &self,
        py: Python<'_>,
        dtype: &Bound<'_, PyArrayDescr>,
    ) -> BridgeResult<NdArray> {
        let array = self.bind(py).ok_or_else(|| self.not_an_array(py))?;
        let cast = array
            .call_method1("astype", (dtype,))
            .map_err(|e| BridgeError::CastFailure {
                from: array.dtype().to_string(),
                to: dtype.to_string(),
                reason: e.to_string(),
            })?;
        NdArray::wrap(&cast)
    }

    fn not_an_array(&self, py: Python<'_>) -> BridgeError {
        BridgeError::NotAnArray {
            type_name: type_name(py.None().bind(py)),
        }
    }
}

impl Clone for NdArray {
    fn clone(&self) -> Self {
        Python::with_gil(|py| self.clone_ref(py))
    }
}

impl Default for NdArray {
    fn default() -> Self {
        Self::none()
    }
}

struct Zeros<'a, 'py> {
    py: Python<'py>,
    shape: &'a [usize],
}

impl<'py> ScalarVisitor for Zeros<'_, 'py> {
    type Output = Bound<'py, PyUntypedArray>;

    fn visit<T: Scalar>(self) -> Self::Output {
        PyArrayDyn::<T>::zeros(self.py, self.shape, false)
            .as_untyped()
            .clone()
    }
}

fn type_name(obj: &Bound<'_, PyAny>) -> String {
    obj.get_type()
        .name()
        .map(|name| name.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string())
}
