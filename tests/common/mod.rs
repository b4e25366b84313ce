//! Common test helpers for ndbridge integration tests
//!
//! Every test runs against an embedded interpreter with NumPy importable.
//!
//! Author: ndbridge contributors

#![allow(dead_code)]

use std::ffi::CString;

use ndbridge::prelude::*;
use pyo3::prelude::*;
use pyo3::types::PyDict;

/// Run `f` with the GIL held and the array conversions registered
pub fn with_py<R>(f: impl FnOnce(Python<'_>) -> R) -> R {
    Python::with_gil(|py| {
        register(py).expect("NumPy must be importable");
        f(py)
    })
}

fn numpy_globals(py: Python<'_>) -> Bound<'_, PyDict> {
    let globals = PyDict::new(py);
    globals
        .set_item("np", py.import("numpy").expect("import numpy"))
        .expect("set np");
    globals
}

/// Evaluate a Python expression with NumPy bound to `np`
pub fn np_eval<'py>(py: Python<'py>, expr: &str) -> Bound<'py, PyAny> {
    let globals = numpy_globals(py);
    let code = CString::new(expr).expect("expression has no NUL");
    py.eval(&code, Some(&globals), None)
        .unwrap_or_else(|e| panic!("eval of `{expr}` failed: {e}"))
}

/// Run Python statements with NumPy bound to `np` and return variable `name`
pub fn np_run<'py>(py: Python<'py>, code: &str, name: &str) -> Bound<'py, PyAny> {
    let globals = numpy_globals(py);
    let source = CString::new(code).expect("code has no NUL");
    py.run(&source, Some(&globals), None)
        .unwrap_or_else(|e| panic!("run failed: {e}"));
    globals
        .get_item(name)
        .expect("lookup")
        .unwrap_or_else(|| panic!("`{name}` not defined"))
}

/// Wrap a Python value that must be an array
pub fn wrap(obj: &Bound<'_, PyAny>) -> NdArray {
    NdArray::wrap(obj).expect("value should be a numpy.ndarray")
}

/// 6x4 uint8 array holding 1..=24 in row-major order
pub fn u8_matrix(py: Python<'_>) -> Bound<'_, PyAny> {
    np_eval(py, "np.arange(1, 25, dtype=np.uint8).reshape(6, 4)")
}

/// 3x2x4 uint8 array holding 1..=24 in row-major order
pub fn u8_cube(py: Python<'_>) -> Bound<'_, PyAny> {
    np_eval(py, "np.arange(1, 25, dtype=np.uint8).reshape(3, 2, 4)")
}

/// Whether two Python arrays hold equal elements
pub fn np_equal(a: &Bound<'_, PyAny>, b: &Bound<'_, PyAny>) -> bool {
    let py = a.py();
    py.import("numpy")
        .and_then(|np| np.call_method1("array_equal", (a, b)))
        .and_then(|r| r.extract())
        .expect("array_equal")
}
