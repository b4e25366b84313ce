//! Conversion options
//!
//! Author: ndbridge contributors

use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;

/// What the inbound conversion may do when the array's dtype differs from
/// the requested element type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CastPolicy {
    /// Cast with NumPy's `astype` regardless of precision loss
    #[default]
    Unsafe,
    /// Cast only when NumPy considers it safe (`PyArray_CanCastSafely`)
    Safe,
    /// Never cast; only zero-copy views are produced
    Never,
}

impl CastPolicy {
    /// Policy name as accepted by [`FromStr`]
    pub const fn name(self) -> &'static str {
        match self {
            CastPolicy::Unsafe => "unsafe",
            CastPolicy::Safe => "safe",
            CastPolicy::Never => "never",
        }
    }
}

impl fmt::Display for CastPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CastPolicy {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unsafe" => Ok(CastPolicy::Unsafe),
            "safe" => Ok(CastPolicy::Safe),
            "never" => Ok(CastPolicy::Never),
            other => Err(BridgeError::UnknownCastPolicy(other.to_string())),
        }
    }
}
