//! Playback service errors and their failure classes.

/// Result type alias for playback service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// How the invoker should react to a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The target id is no longer known to the service; re-resolve it.
    TargetStale,

    /// The access token was rejected; re-authorize.
    AuthorizationStale,

    /// Anything else.
    Unclassified,
}

/// Errors reported by a playback service.
///
/// `Clone` so scripted responses can be replayed by the mock service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The service rejected the access token or client credentials.
    #[error("Unauthorized: {body}")]
    Unauthorized { body: String },

    /// The service does not know the playback target.
    #[error("Playback target {target} not found")]
    TargetNotFound { target: String },

    /// Any other unsuccessful status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Request did not complete within the per-call timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection or transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    Parse(String),

    /// The client could not be constructed.
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Failure class of this error.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::TargetNotFound { .. } => FailureClass::TargetStale,
            Self::Unauthorized { .. } => FailureClass::AuthorizationStale,
            _ => FailureClass::Unclassified,
        }
    }

    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::Parse(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}
