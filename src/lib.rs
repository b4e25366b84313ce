//! # ndbridge
//!
//! Zero-copy bridge between NumPy arrays and statically-typed
//! [`ndarray`] views.
//!
//! ## Features
//!
//! - **Handles**: [`NdArray`] shares ownership of a `numpy.ndarray` through
//!   Python reference counting
//! - **Metadata**: rank, shape, byte strides, item size and element type,
//!   read from NumPy's array header
//! - **Inbound**: [`to_view`] aliases the NumPy buffer when the dtype matches
//!   and falls back to a NumPy cast when it does not
//! - **Outbound**: [`from_array`] copies an ndarray value into a new NumPy array
//! - **Marshalling**: `FromPyObject` / `IntoPyObject` impls so `#[pyfunction]`
//!   signatures can use the bridge types directly
//!
//! ## Example
//!
//! ```rust,no_run
//! use ndbridge::prelude::*;
//! use pyo3::prelude::*;
//!
//! Python::with_gil(|py| -> PyResult<()> {
//!     register(py)?;
//!
//!     let matrix = ndarray::Array2::<f64>::eye(3);
//!     let handle = from_array(py, &matrix);
//!
//!     let view = to_view::<f64, ndarray::Ix2>(py, &handle)?;
//!     assert_eq!(view.view(), matrix);
//!     Ok(())
//! })
//! .unwrap();
//! ```
//!
//! Author: ndbridge contributors

#![warn(missing_docs)]

pub mod boundary;
pub mod config;
pub mod dtype;
pub mod error;
pub mod handle;
pub mod python;
pub mod view;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::boundary::{is_registered, register};
    pub use crate::config::CastPolicy;
    pub use crate::dtype::{
        are_equivalent, can_cast_safely, element_type_of, ElementType, Scalar, ScalarVisitor,
    };
    pub use crate::error::{BridgeError, BridgeResult};
    pub use crate::handle::NdArray;
    pub use crate::view::{from_array, to_view, to_view_with, TypedView, TypedViewMut};
}

// Re-exports for convenience
pub use config::CastPolicy;
pub use dtype::{ElementType, Scalar};
pub use error::{BridgeError, BridgeResult};
pub use handle::NdArray;
pub use view::{from_array, to_view, to_view_with, TypedView, TypedViewMut};
