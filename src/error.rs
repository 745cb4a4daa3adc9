//! Error types for scatr
//!
//! Only caller-side precondition violations surface here. Inside a kernel,
//! invalid indices, quantization saturation and unmatched configurations are
//! silent.

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using scatr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when preparing or launching a scatter-add
#[derive(Error, Debug)]
pub enum Error {
    /// Buffer length does not match the shape it is supposed to describe
    #[error("Shape mismatch for '{arg}': expected {expected} elements, got {got}")]
    ShapeMismatch {
        /// The argument name
        arg: &'static str,
        /// Expected element count
        expected: usize,
        /// Actual element count
        got: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// DType recorded in the configuration does not match the buffer type
    #[error("DType mismatch: configuration says {expected:?}, buffer is {got:?}")]
    DTypeMismatch {
        /// DType from the configuration descriptor
        expected: DType,
        /// DType of the typed buffer
        got: DType,
    },

    /// Workspace is smaller than the layout the launch needs
    #[error(
        "Workspace exhausted: region '{region}' needs {requested} bytes, {available} bytes left"
    )]
    WorkspaceExhausted {
        /// Region being carved
        region: &'static str,
        /// Requested bytes (after alignment padding)
        requested: usize,
        /// Bytes remaining in the arena
        available: usize,
    },

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(arg: &'static str, expected: usize, got: usize) -> Self {
        Self::ShapeMismatch { arg, expected, got }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}
