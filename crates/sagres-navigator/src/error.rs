//! Error types for the navigator.
//!
//! Operations never surface these directly: every operation resolves to an
//! [`OperationResult`](crate::operation::OperationResult) and keeps the
//! originating error as its `cause`.

/// Convenience alias used throughout the crate.
pub type SagresResult<T> = Result<T, SagresError>;

/// All errors that can occur while talking to a Sagres portal.
#[derive(thiserror::Error, Debug)]
pub enum SagresError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown institution: {0}")]
    UnknownInstitution(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Offer {code} was not found when re-reading the demand page")]
    OfferNotFound { code: String },

    #[error("Offer {code} matched {count} entries when re-reading the demand page")]
    OfferAmbiguous { code: String, count: usize },

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SagresError {
    /// Whether this error came from the network layer (including cancellation).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            SagresError::Transport(_) | SagresError::Cancelled | SagresError::Io(_)
        )
    }

    /// Whether the request was aborted through the tag registry.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SagresError::Cancelled)
    }
}

impl From<tokio::task::JoinError> for SagresError {
    fn from(e: tokio::task::JoinError) -> Self {
        SagresError::Executor(e.to_string())
    }
}
