//! Python-visible functions built on the bridge.
//!
//! Author: ndbridge contributors

use ndarray::{Axis, Ix2, IxDyn};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyTuple};

use crate::config::CastPolicy;
use crate::dtype::{self, ElementType, Scalar, ScalarVisitor};
use crate::error::BridgeResult;
use crate::handle::NdArray;
use crate::view::{from_array, to_view_with, TypedView};

/// Report the metadata the bridge sees for `array`
#[pyfunction]
pub fn describe<'py>(py: Python<'py>, array: NdArray) -> PyResult<Bound<'py, PyDict>> {
    let info = PyDict::new(py);
    info.set_item("ndim", array.ndim(py))?;
    info.set_item("shape", PyTuple::new(py, array.shape(py))?)?;
    info.set_item("strides", PyTuple::new(py, array.strides(py))?)?;
    info.set_item("itemsize", array.itemsize(py))?;
    info.set_item("dtype", array.dtype(py)?)?;
    info.set_item(
        "element_type",
        array.element_type(py).ok().map(ElementType::name),
    )?;
    info.set_item("writeable", array.is_writeable(py))?;
    info.set_item("c_contiguous", array.is_c_contiguous(py))?;
    Ok(info)
}

/// Names of all supported element types
#[pyfunction]
pub fn element_types() -> Vec<&'static str> {
    ElementType::ALL.iter().map(|elem| elem.name()).collect()
}

/// Whether NumPy considers the cast from `src` to `dst` safe
#[pyfunction]
pub fn can_cast_safely(py: Python<'_>, src: &str, dst: &str) -> PyResult<bool> {
    Ok(dtype::can_cast_safely(py, src.parse()?, dst.parse()?))
}

/// Whether `a` and `b` share an in-memory representation
#[pyfunction]
pub fn are_equivalent(py: Python<'_>, a: &str, b: &str) -> PyResult<bool> {
    Ok(dtype::are_equivalent(py, a.parse()?, b.parse()?))
}

struct Retype<'a, 'py> {
    py: Python<'py>,
    array: &'a NdArray,
    policy: CastPolicy,
}

impl ScalarVisitor for Retype<'_, '_> {
    type Output = BridgeResult<NdArray>;

    fn visit<T: Scalar>(self) -> Self::Output {
        let view = to_view_with::<T, IxDyn>(self.py, self.array, self.policy)?;
        Ok(from_array(self.py, &view.view()))
    }
}

/// Copy `array` into a new C-contiguous array of element type `dtype`
#[pyfunction]
#[pyo3(signature = (array, dtype, policy="unsafe"))]
pub fn as_type(py: Python<'_>, array: NdArray, dtype: &str, policy: &str) -> PyResult<NdArray> {
    let elem: ElementType = dtype.parse()?;
    let policy: CastPolicy = policy.parse()?;
    Ok(elem.visit(Retype {
        py,
        array: &array,
        policy,
    })?)
}

/// Multiply a float64 array by `factor` in place
#[pyfunction]
pub fn scale_(py: Python<'_>, array: NdArray, factor: f64) -> PyResult<()> {
    let mut view = to_view_with::<f64, IxDyn>(py, &array, CastPolicy::Never)?;
    if view.is_copy() {
        return Err(PyValueError::new_err("scale_ needs an aligned float64 array"));
    }
    view.view_mut(py)?.mapv_inplace(|v| v * factor);
    Ok(())
}

/// Sum each row of a 2-D array (cast to float64)
#[pyfunction]
pub fn row_sums(py: Python<'_>, matrix: TypedView<f64, Ix2>) -> NdArray {
    from_array(py, &matrix.view().sum_axis(Axis(1)))
}
