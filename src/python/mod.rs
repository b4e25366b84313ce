//! Python module for ndbridge
//!
//! Exposes the bridge's metadata queries and conversions via PyO3.
//!
//! Author: ndbridge contributors

mod functions;

pub use functions::{
    are_equivalent, as_type, can_cast_safely, describe, element_types, row_sums, scale_,
};

use pyo3::prelude::*;

/// Python module
#[pymodule]
pub fn ndbridge(m: &Bound<'_, PyModule>) -> PyResult<()> {
    crate::boundary::register(m.py())?;

    // Registry
    m.add_function(wrap_pyfunction!(functions::element_types, m)?)?;
    m.add_function(wrap_pyfunction!(functions::can_cast_safely, m)?)?;
    m.add_function(wrap_pyfunction!(functions::are_equivalent, m)?)?;

    // Arrays
    m.add_function(wrap_pyfunction!(functions::describe, m)?)?;
    m.add_function(wrap_pyfunction!(functions::as_type, m)?)?;
    m.add_function(wrap_pyfunction!(functions::scale_, m)?)?;
    m.add_function(wrap_pyfunction!(functions::row_sums, m)?)?;

    m.add("__version__", crate::VERSION)?;
    Ok(())
}
