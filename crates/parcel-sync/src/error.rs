use parcel_crypto::HasherError;
use parcel_protocol::ProtocolError;
use parcel_store::StoreError;
use thiserror::Error;

/// Why a resolution attempt was aborted.
///
/// An invalid signature is not an error; it is a
/// [`SyncOutcome`](crate::SyncOutcome).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Fetched content does not hash to what was requested.
    #[error("integrity check failed: {0}")]
    Integrity(String),
}

/// Coarse classification used in logs and by callers deciding what to report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    TransportFailure,
    DecodeFailure,
    StoreFailure,
}

impl SyncError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::TransportFailure,
            Self::Decode(_) | Self::Integrity(_) => FailureKind::DecodeFailure,
            Self::Store(_) => FailureKind::StoreFailure,
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Decode(msg) => Self::Decode(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<HasherError> for SyncError {
    fn from(e: HasherError) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
