//! PyO3 marshalling for bridge types
//!
//! These impls let `#[pyfunction]` signatures take [`NdArray`] or
//! [`TypedView`] arguments and return [`NdArray`] values directly:
//!
//! - **Inbound**: `FromPyObject` wraps the value (new strong reference).
//!   Non-arrays fail extraction, so PyO3 moves on to the next candidate of a
//!   `#[derive(FromPyObject)]` enum, or reports a `TypeError`.
//! - **Outbound**: `IntoPyObject` hands exactly one reference to the caller.
//!
//! Author: ndbridge contributors

use std::convert::Infallible;

use ndarray::Dimension;
use pyo3::prelude::*;
use pyo3::sync::GILOnceCell;

use crate::dtype::{ElementType, Scalar};
use crate::handle::NdArray;
use crate::view::{to_view, TypedView};

static REGISTERED: GILOnceCell<()> = GILOnceCell::new();

/// Make NumPy array support available to the conversions.
///
/// Imports NumPy and its C-API once per process; later calls are no-ops.
pub fn register(py: Python<'_>) -> PyResult<()> {
    REGISTERED.get_or_try_init(py, || {
        let module = py.import("numpy")?;
        let version: String = module.getattr("__version__")?.extract()?;
        // Resolves the C-API capsule
        let _ = ElementType::Float64.dtype(py);
        log::debug!("registered NumPy {version} array conversions");
        Ok::<_, PyErr>(())
    })?;
    Ok(())
}

/// Whether [`register`] has completed in this process
pub fn is_registered(py: Python<'_>) -> bool {
    REGISTERED.get(py).is_some()
}

impl<'py> FromPyObject<'py> for NdArray {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        Ok(NdArray::wrap(ob)?)
    }
}

impl<'py, T: Scalar, D: Dimension> FromPyObject<'py> for TypedView<T, D> {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        let handle = NdArray::wrap(ob)?;
        Ok(to_view(ob.py(), &handle)?)
    }
}

impl<'py> IntoPyObject<'py> for NdArray {
    type Target = PyAny;
    type Output = Bound<'py, PyAny>;
    type Error = Infallible;

    fn into_pyobject(self, py: Python<'py>) -> Result<Self::Output, Self::Error> {
        Ok(self.into_bound(py))
    }
}

impl<'py> IntoPyObject<'py> for &NdArray {
    type Target = PyAny;
    type Output = Bound<'py, PyAny>;
    type Error = Infallible;

    fn into_pyobject(self, py: Python<'py>) -> Result<Self::Output, Self::Error> {
        Ok(self.clone_ref(py).into_bound(py))
    }
}
