use thiserror::Error;

/// Outcome of a failed snap attempt.
///
/// `NoResult` is the expected "nothing recognized" answer from the backend;
/// everything else (capture, network, server, decoding) is `Technical`.
#[derive(Error, Debug)]
pub enum SnapError {
    #[error("No sport event recognized in snapshot")]
    NoResult,

    #[error("Snap failed: {0}")]
    Technical(String),
}

impl SnapError {
    pub fn technical(msg: impl Into<String>) -> Self {
        SnapError::Technical(msg.into())
    }

    pub fn is_no_result(&self) -> bool {
        matches!(self, SnapError::NoResult)
    }
}

impl From<reqwest::Error> for SnapError {
    fn from(e: reqwest::Error) -> Self {
        SnapError::Technical(format!("Lookup request failed: {}", e))
    }
}

impl From<std::io::Error> for SnapError {
    fn from(e: std::io::Error) -> Self {
        SnapError::Technical(format!("I/O error: {}", e))
    }
}

pub type SnapResult<T> = std::result::Result<T, SnapError>;
