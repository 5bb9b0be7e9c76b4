//! Error type shared by all collaborator traits.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalError {
    /// Operation not supported on this pin/unit/platform.
    NotSupported,
    /// Argument outside the hardware's valid range.
    InvalidArg,
    /// Resource exists but is claimed by someone else.
    Busy,
    /// No free unit/channel/memory to satisfy the request.
    NoResources,
    /// Peripheral is not initialized / not up.
    NotReady,
    /// Driver-level failure with the vendor status code.
    Hardware(i32),
}

pub type HalResult<T> = Result<T, HalError>;

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalError::NotSupported => f.write_str("not supported"),
            HalError::InvalidArg => f.write_str("invalid argument"),
            HalError::Busy => f.write_str("resource busy"),
            HalError::NoResources => f.write_str("out of resources"),
            HalError::NotReady => f.write_str("peripheral is not up"),
            HalError::Hardware(code) => write!(f, "driver error {code}"),
        }
    }
}
