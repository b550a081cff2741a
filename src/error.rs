use thiserror::Error;

pub type Result<T, E = QaError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QaError {
    /// Not allowed for the current user (own post, already voted, not the author).
    #[error("forbidden by server")]
    Forbidden,
    /// Server refused the payload (bad `like`, answer already starred, ...)
    #[error("rejected by server")]
    BadRequest,
    #[error("unexpected response status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Network(String),
    #[error("browser error: {0}")]
    Dom(String),
}

impl QaError {
    /// Map a non-200 completion to an error
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            403 => Self::Forbidden,
            other => Self::Status(other),
        }
    }
}
