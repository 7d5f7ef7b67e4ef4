use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid meta: {0}")]
    InvalidMeta(String),

    #[error("invalid root hash key: {0}")]
    InvalidKey(String),
}
