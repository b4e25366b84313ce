//! Integration tests: PyO3 marshalling and the Python module
//!
//! Exercises the conversions the way Python callers reach them.
//!
//! Author: ndbridge contributors

mod common;

use common::*;
use ndarray::Ix2;
use ndbridge::prelude::*;
use pyo3::exceptions::{PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use pyo3::wrap_pymodule;

fn module(py: Python<'_>) -> Bound<'_, PyModule> {
    wrap_pymodule!(ndbridge::python::ndbridge)(py).into_bound(py)
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn register_is_idempotent() {
    Python::with_gil(|py| {
        register(py).unwrap();
        register(py).unwrap();
        assert!(is_registered(py));
    });
}

// ============================================================================
// Inbound / outbound converters
// ============================================================================

#[test]
fn extract_wraps_array() {
    with_py(|py| {
        let obj = u8_matrix(py);
        let before = obj.get_refcnt();

        let handle: NdArray = obj.extract().unwrap();
        assert_eq!(handle.shape(py), &[6, 4]);
        assert_eq!(obj.get_refcnt(), before + 1);
    });
}

#[test]
fn extract_optional_array() {
    with_py(|py| {
        let none: Option<NdArray> = py.None().bind(py).extract().unwrap();
        assert!(none.is_none());

        let some: Option<NdArray> = u8_matrix(py).extract().unwrap();
        assert!(some.is_some());
    });
}

#[derive(FromPyObject)]
enum ArrayOrList<'py> {
    Array(NdArray),
    List(Bound<'py, PyList>),
}

#[test]
fn non_array_is_declined_for_next_candidate() {
    with_py(|py| {
        let list = PyList::new(py, [1, 2, 3]).unwrap();
        let before = list.get_refcnt();
        match list.extract::<ArrayOrList>().unwrap() {
            ArrayOrList::List(l) => assert_eq!(l.len(), 3),
            ArrayOrList::Array(_) => panic!("list must not convert to an array"),
        }
        assert_eq!(list.get_refcnt(), before);

        match u8_cube(py).extract::<ArrayOrList>().unwrap() {
            ArrayOrList::Array(a) => assert_eq!(a.ndim(py), 3),
            ArrayOrList::List(_) => panic!("array should convert to NdArray"),
        }
    });
}

#[test]
fn extract_typed_view() {
    with_py(|py| {
        let view: TypedView<u8, Ix2> = u8_matrix(py).extract().unwrap();
        assert_eq!(view.view()[[5, 3]], 24);

        let err = u8_cube(py).extract::<TypedView<u8, Ix2>>().unwrap_err();
        assert!(err.is_instance_of::<PyValueError>(py));
        assert!(err.to_string().contains("rank 2"), "{err}");
    });
}

#[test]
fn into_pyobject_hands_over_one_reference() {
    with_py(|py| {
        let obj = u8_matrix(py);
        let before = obj.get_refcnt();

        let handle = wrap(&obj);
        let back = (&handle).into_pyobject(py).unwrap();
        assert!(back.is(&obj));
        assert_eq!(obj.get_refcnt(), before + 2);

        let moved = handle.into_pyobject(py).unwrap();
        assert_eq!(obj.get_refcnt(), before + 2);
        drop((back, moved));
        assert_eq!(obj.get_refcnt(), before);
    });
}

#[test]
fn sentinel_converts_back_to_none() {
    with_py(|py| {
        let obj = NdArray::none().into_pyobject(py).unwrap();
        assert!(obj.is_none());
    });
}

// ============================================================================
// Python module
// ============================================================================

#[test]
fn module_describe() {
    with_py(|py| {
        let m = module(py);
        let info = m
            .getattr("describe")
            .unwrap()
            .call1((u8_matrix(py),))
            .unwrap();
        let info = info.downcast::<PyDict>().unwrap();

        let get = |key: &str| info.get_item(key).unwrap().unwrap();
        assert_eq!(get("ndim").extract::<usize>().unwrap(), 2);
        assert_eq!(get("shape").extract::<(usize, usize)>().unwrap(), (6, 4));
        assert_eq!(get("strides").extract::<(isize, isize)>().unwrap(), (4, 1));
        assert_eq!(get("element_type").extract::<String>().unwrap(), "uint8");
        assert!(get("writeable").extract::<bool>().unwrap());
    });
}

#[test]
fn module_describe_rejects_list() {
    with_py(|py| {
        let list = PyList::new(py, [1, 2]).unwrap();
        let err = module(py)
            .getattr("describe")
            .unwrap()
            .call1((list,))
            .unwrap_err();
        assert!(err.is_instance_of::<PyTypeError>(py));
    });
}

#[test]
fn module_registry_queries() {
    with_py(|py| {
        let m = module(py);
        let names: Vec<String> = m
            .getattr("element_types")
            .unwrap()
            .call0()
            .unwrap()
            .extract()
            .unwrap();
        assert_eq!(names.len(), ElementType::ALL.len());
        assert!(names.iter().any(|n| n == "complex128"));

        let safe = |src: &str, dst: &str| -> bool {
            m.getattr("can_cast_safely")
                .unwrap()
                .call1((src, dst))
                .unwrap()
                .extract()
                .unwrap()
        };
        assert!(safe("uint8", "uint16"));
        assert!(safe("int32", "float64"));
        assert!(!safe("float64", "float32"));
        assert!(!safe("int16", "uint16"));

        let err = m
            .getattr("are_equivalent")
            .unwrap()
            .call1(("float80", "float64"))
            .unwrap_err();
        assert!(err.is_instance_of::<PyTypeError>(py));
    });
}

#[test]
fn module_as_type() {
    with_py(|py| {
        let m = module(py);
        let result = m
            .getattr("as_type")
            .unwrap()
            .call1((u8_cube(py), "float32"))
            .unwrap();
        let expected = np_eval(py, "np.arange(1, 25, dtype=np.float32).reshape(3, 2, 4)");
        assert!(np_equal(&result, &expected));
        let dtype: String = result.getattr("dtype").unwrap().str().unwrap().to_string();
        assert_eq!(dtype, "float32");

        let kwargs = PyDict::new(py);
        kwargs.set_item("policy", "safe").unwrap();
        let err = m
            .getattr("as_type")
            .unwrap()
            .call((np_eval(py, "np.ones(3)"), "int8"), Some(&kwargs))
            .unwrap_err();
        assert!(err.is_instance_of::<PyTypeError>(py));
    });
}

#[test]
fn module_scale_in_place() {
    with_py(|py| {
        let obj = np_eval(py, "np.arange(6.0).reshape(2, 3)[:, ::2]");
        let base = obj.getattr("base").unwrap();
        module(py)
            .getattr("scale_")
            .unwrap()
            .call1((&obj, 2.0))
            .unwrap();

        let expected = np_eval(py, "np.array([0.0, 1.0, 4.0, 6.0, 4.0, 10.0])");
        assert!(np_equal(&base, &expected));

        let err = module(py)
            .getattr("scale_")
            .unwrap()
            .call1((np_eval(py, "np.arange(3)"), 2.0))
            .unwrap_err();
        assert!(err.is_instance_of::<PyTypeError>(py));
    });
}

#[test]
fn module_row_sums() {
    with_py(|py| {
        let m = module(py);
        let sums = m
            .getattr("row_sums")
            .unwrap()
            .call1((u8_matrix(py),))
            .unwrap();
        let expected = np_eval(py, "np.array([10.0, 26.0, 42.0, 58.0, 74.0, 90.0])");
        assert!(np_equal(&sums, &expected));

        let err = m
            .getattr("row_sums")
            .unwrap()
            .call1((u8_cube(py),))
            .unwrap_err();
        assert!(err.is_instance_of::<PyValueError>(py));
    });
}
