//! Error handling for the PIR protocol
//!
//! One error enum covers every failure the protocol reports synchronously.
//! Wrong bytes caused by mismatched parameters or an undersized modulus chain
//! are not detectable here and never surface as an error.

use std::fmt;

/// Client identifier under which Galois keys are registered
pub type ClientId = u32;

/// PIR operation error
#[derive(Debug)]
pub enum PirError {
    /// Invalid parameter combination or insufficient noise budget
    Parameter(String),
    /// Operation called out of order or with malformed input
    Usage(String),
    /// No Galois keys registered for this client
    KeyNotFound(ClientId),
    /// Wrong number of ciphertexts (or bytes) for the parameter set
    DimensionMismatch { expected: usize, actual: usize },
    /// Index past the end of the database
    IndexOutOfRange { index: u64, bound: u64 },
    /// Malformed wire data
    Serialization(String),
}

impl fmt::Display for PirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PirError::Parameter(msg) => write!(f, "parameter error: {}", msg),
            PirError::Usage(msg) => write!(f, "usage error: {}", msg),
            PirError::KeyNotFound(id) => write!(f, "no galois keys registered for client {}", id),
            PirError::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {}, got {}", expected, actual)
            }
            PirError::IndexOutOfRange { index, bound } => {
                write!(f, "index {} out of range (bound {})", index, bound)
            }
            PirError::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for PirError {}

impl From<std::io::Error> for PirError {
    fn from(err: std::io::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for PirError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for PIR operations
pub type Result<T> = std::result::Result<T, PirError>;

/// Create a `PirError::Parameter` with format string support
macro_rules! param_err {
    ($($arg:tt)*) => {
        $crate::pir::error::PirError::Parameter(format!($($arg)*))
    };
}

/// Create a `PirError::Usage` with format string support
macro_rules! usage_err {
    ($($arg:tt)*) => {
        $crate::pir::error::PirError::Usage(format!($($arg)*))
    };
}

pub(crate) use param_err;
pub(crate) use usage_err;
