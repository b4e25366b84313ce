//! Element type registry
//!
//! Maps the closed set of native scalar types onto NumPy dtypes and back.
//! The set is declared once in [`element_types!`]; the enum, the sealed
//! [`Scalar`] impls, names, sizes and runtime dispatch are all generated
//! from that single list.
//!
//! Casting rules are never reimplemented here: [`can_cast_safely`] and
//! [`are_equivalent`] ask NumPy.
//!
//! Author: ndbridge contributors

use std::fmt;
use std::str::FromStr;

use numpy::npyffi::PY_ARRAY_API;
use numpy::{Complex32, Complex64, Element, PyArrayDescr, PyArrayDescrMethods};
use pyo3::prelude::*;

use crate::error::BridgeError;

mod sealed {
    pub trait Sealed {}
}

/// A native scalar type the bridge can move across the boundary.
///
/// Sealed: implemented only for the types listed in [`ElementType`], so
/// asking for a view of any other element type does not compile.
pub trait Scalar:
    Element + Copy + PartialEq + fmt::Debug + Send + Sync + 'static + sealed::Sealed
{
    /// Registry tag for this type
    const ELEMENT_TYPE: ElementType;
}

/// Generic callback for dispatching a runtime [`ElementType`] to code
/// parameterized over `T: Scalar`.
pub trait ScalarVisitor {
    /// Value produced by the visit
    type Output;

    /// Called with `T` bound to the native type of the visited tag
    fn visit<T: Scalar>(self) -> Self::Output;
}

macro_rules! element_types {
    ($($variant:ident => $ty:ty, $name:literal;)+) => {
        /// Scalar element type tag (closed set)
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum ElementType {
            $(
                #[doc = concat!("`", $name, "` (`", stringify!($ty), "`)")]
                $variant,
            )+
        }

        impl ElementType {
            /// Every supported tag, in declaration order
            pub const ALL: &'static [ElementType] = &[$(ElementType::$variant),+];

            /// Diagnostic name, matching NumPy's dtype name
            pub const fn name(self) -> &'static str {
                match self {
                    $(ElementType::$variant => $name,)+
                }
            }

            /// Size in bytes of one element
            pub const fn size(self) -> usize {
                match self {
                    $(ElementType::$variant => std::mem::size_of::<$ty>(),)+
                }
            }

            /// Run `visitor` with `T` set to the native type of this tag
            pub fn visit<V: ScalarVisitor>(self, visitor: V) -> V::Output {
                match self {
                    $(ElementType::$variant => visitor.visit::<$ty>(),)+
                }
            }
        }

        $(
            impl sealed::Sealed for $ty {}

            impl Scalar for $ty {
                const ELEMENT_TYPE: ElementType = ElementType::$variant;
            }
        )+
    };
}

element_types! {
    Bool => bool, "bool";
    Int8 => i8, "int8";
    Int16 => i16, "int16";
    Int32 => i32, "int32";
    Int64 => i64, "int64";
    UInt8 => u8, "uint8";
    UInt16 => u16, "uint16";
    UInt32 => u32, "uint32";
    UInt64 => u64, "uint64";
    Float32 => f32, "float32";
    Float64 => f64, "float64";
    Complex64 => Complex32, "complex64";
    Complex128 => Complex64, "complex128";
}

/// Tag for a compile-time known scalar type
#[inline]
pub const fn element_type_of<T: Scalar>() -> ElementType {
    T::ELEMENT_TYPE
}

struct DtypeOf<'py>(Python<'py>);

impl<'py> ScalarVisitor for DtypeOf<'py> {
    type Output = Bound<'py, PyArrayDescr>;

    fn visit<T: Scalar>(self) -> Self::Output {
        T::get_dtype(self.0)
    }
}

impl ElementType {
    /// NumPy descriptor for this tag
    pub fn dtype<'py>(self, py: Python<'py>) -> Bound<'py, PyArrayDescr> {
        self.visit(DtypeOf(py))
    }

    /// Reverse lookup by NumPy equivalence.
    ///
    /// Returns `None` for dtypes outside the closed set (float16, object,
    /// strings, structured, non-native byte order, ...).
    pub fn from_dtype(dtype: &Bound<'_, PyArrayDescr>) -> Option<ElementType> {
        let py = dtype.py();
        Self::ALL
            .iter()
            .copied()
            .find(|elem| elem.dtype(py).is_equiv_to(dtype))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|elem| elem.name() == s)
            .ok_or_else(|| BridgeError::UnsupportedElementType(s.to_string()))
    }
}

// ============================================================================
// NumPy type compatibility
// ============================================================================

/// Whether NumPy's promotion rules allow a safe cast from `src` to `dst`.
pub fn can_cast_safely(py: Python<'_>, src: ElementType, dst: ElementType) -> bool {
    can_cast_dtype_safely(py, &src.dtype(py), &dst.dtype(py))
}

/// [`can_cast_safely`] for arbitrary descriptors, including ones outside
/// the closed set.
pub(crate) fn can_cast_dtype_safely(
    py: Python<'_>,
    src: &Bound<'_, PyArrayDescr>,
    dst: &Bound<'_, PyArrayDescr>,
) -> bool {
    // SAFETY: PyArray_CanCastSafely only reads NumPy's casting tables; both
    // type numbers come from live descriptors and the GIL is held.
    unsafe { PY_ARRAY_API.PyArray_CanCastSafely(py, src.num(), dst.num()) != 0 }
}

/// Whether two tags have bit-identical in-memory representations.
pub fn are_equivalent(py: Python<'_>, a: ElementType, b: ElementType) -> bool {
    a.dtype(py).is_equiv_to(&b.dtype(py))
}
