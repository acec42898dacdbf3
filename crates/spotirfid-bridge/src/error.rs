//! Bridge errors.
//!
//! Only startup failures and a lost reader surface as errors. Everything
//! that can go wrong while handling a scan is reported as an
//! [`Outcome`](crate::Outcome) instead.

use spotirfid_hardware::HardwareError;
use spotirfid_network::ServiceError;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// No advertised playback target matches the configured name.
    #[error("Playback target {name:?} not found")]
    TargetNotFound { name: String },

    /// Startup authorization or enumeration failed.
    #[error("Playback service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// Inconsistent configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Returns `true` if the control loop may continue after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Hardware(e) => e.is_transient(),
            _ => false,
        }
    }
}
