//! Error types for kafka-types crate.

use thiserror::Error;

/// Errors raised while reading the registry wire format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireFormatError {
    #[error("Payload too short: need at least {required} bytes, got {actual}")]
    TooShort { required: usize, actual: usize },
}

/// Result type alias for kafka-types operations.
pub type Result<T> = std::result::Result<T, WireFormatError>;
