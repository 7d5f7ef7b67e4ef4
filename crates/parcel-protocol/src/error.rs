use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The response body could not be parsed.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProtocolError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
