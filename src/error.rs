//! Bridge errors and their mapping onto Python exceptions
//!
//! Author: ndbridge contributors

use pyo3::exceptions::{PyRuntimeError, PyTypeError, PyValueError};
use pyo3::PyErr;
use thiserror::Error;

/// Errors raised while converting arrays across the boundary
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Value is neither a `numpy.ndarray` nor `None`
    #[error("Not a numpy.ndarray: got {type_name}")]
    NotAnArray {
        /// Python type name of the rejected value
        type_name: String,
    },

    /// Static rank requested by the consumer differs from the array's rank
    #[error("expected an array of rank {expected}, got instead rank {actual}")]
    RankMismatch {
        /// Rank requested by the caller
        expected: usize,
        /// Rank of the foreign array
        actual: usize,
    },

    /// Dtype outside the supported element set
    #[error("Unsupported element type: {0}")]
    UnsupportedElementType(String),

    /// NumPy refused the element-type conversion
    #[error("Cannot cast array from {from} to {to}: {reason}")]
    CastFailure {
        /// Source dtype
        from: String,
        /// Requested dtype
        to: String,
        /// Message reported by NumPy
        reason: String,
    },

    /// Cast rejected by the active cast policy
    #[error("Refusing to cast array from {from} to {to} under the {policy} cast policy")]
    UnsafeCast {
        /// Source dtype
        from: String,
        /// Requested dtype
        to: String,
        /// Policy that rejected the cast
        policy: &'static str,
    },

    /// Byte stride that is not a whole number of elements
    #[error("Byte stride {stride} on axis {axis} is not a multiple of the element size {itemsize}")]
    LayoutViolation {
        /// Offending axis
        axis: usize,
        /// Byte stride reported by NumPy
        stride: isize,
        /// Size of the requested element type
        itemsize: usize,
    },

    /// Mutable view requested over a read-only array
    #[error("Array is read-only")]
    ReadOnly,

    /// Mutable view requested while another one over the same buffer is live
    #[error("Array is already borrowed mutably or read elsewhere")]
    AlreadyBorrowed,

    /// Mutable view requested over an array whose elements alias each other
    #[error("Array overlaps itself along axis {axis}; cannot write through it")]
    SelfOverlap {
        /// First axis with a zero stride and more than one element
        axis: usize,
    },

    /// Cast policy name not recognized
    #[error("Unknown cast policy '{0}' (expected unsafe, safe or never)")]
    UnknownCastPolicy(String),
}

/// Result alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

impl From<BridgeError> for PyErr {
    fn from(err: BridgeError) -> PyErr {
        let msg = err.to_string();
        match err {
            BridgeError::NotAnArray { .. }
            | BridgeError::UnsupportedElementType(_)
            | BridgeError::CastFailure { .. }
            | BridgeError::UnsafeCast { .. } => PyTypeError::new_err(msg),
            BridgeError::RankMismatch { .. }
            | BridgeError::ReadOnly
            | BridgeError::SelfOverlap { .. }
            | BridgeError::UnknownCastPolicy(_) => PyValueError::new_err(msg),
            BridgeError::LayoutViolation { .. } | BridgeError::AlreadyBorrowed => {
                PyRuntimeError::new_err(msg)
            }
        }
    }
}
