//! Error types for the builder crate.

use std::path::PathBuf;

use parcel_crypto::{HasherError, SignatureError};

/// Errors that can occur while building a parcel.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// No input paths were given.
    #[error("no input paths")]
    EmptyInput,

    /// An input could not be stat'd or read, or is neither a file nor a directory.
    #[error("cannot read {}: {source}", path.display())]
    PathUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Signing the parcel failed.
    #[error("signing failed: {0}")]
    Signing(#[from] SignatureError),

    /// A header or object could not be hashed.
    #[error("hashing failed: {0}")]
    Hashing(#[from] HasherError),
}

/// Convenience alias for builder results.
pub type BuildResult<T> = Result<T, BuildError>;
