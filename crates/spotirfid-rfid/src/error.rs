//! Error types for tag memory operations.

use spotirfid_hardware::HardwareError;

/// Result type alias for tag memory operations.
pub type Result<T> = std::result::Result<T, TagError>;

/// Errors that can occur while reading or writing tag memory.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// The payload cannot be stored and read back unchanged.
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// The payload does not fit between the start page and the last user page.
    #[error("Payload of {bytes} bytes does not fit: {available} bytes available from page {start_page}")]
    PayloadTooLarge {
        bytes: usize,
        available: usize,
        start_page: u8,
    },

    /// Discovery found no candidate start page in user memory.
    #[error("No writable page found in user memory")]
    NoWritablePageFound,

    /// The reader reported an error writing a specific page.
    #[error("Write failed at page {page}: {source}")]
    WriteFailed {
        page: u8,
        #[source]
        source: HardwareError,
    },

    /// Read-back after a complete write differs from the payload.
    #[error("Verification mismatch: wrote {expected:?}, read back {actual:?}")]
    VerificationMismatch { expected: String, actual: String },

    /// No tag in the field when an attempt started.
    #[error("No tag present")]
    NoTagPresent,

    /// A different tag entered the field between attempts.
    #[error("Tag changed: expected {expected}, found {found}")]
    TagChanged { expected: String, found: String },

    /// Every attempt failed; `last` is the failure of the final attempt.
    #[error("All {attempts} write attempts failed, last error: {last}")]
    AllRetriesExhausted { attempts: u32, last: Box<TagError> },

    /// Layout bounds are inconsistent.
    #[error("Invalid tag layout: {0}")]
    InvalidLayout(String),

    /// Reader error outside a page write.
    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

impl TagError {
    /// Create a new invalid payload error.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }

    /// Returns `true` if another attempt may succeed.
    ///
    /// Payload size and layout problems are decided before any page is
    /// touched and do not change between attempts. A disconnected reader
    /// will not come back within a write.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidPayload { .. }
            | Self::PayloadTooLarge { .. }
            | Self::NoWritablePageFound
            | Self::InvalidLayout(_)
            | Self::AllRetriesExhausted { .. } => false,
            Self::Hardware(e) | Self::WriteFailed { source: e, .. } => e.is_transient(),
            Self::VerificationMismatch { .. } | Self::NoTagPresent | Self::TagChanged { .. } => {
                true
            }
        }
    }
}
