//! Errors reported by the tag reader and the status indicator.
//!
//! Only [`HardwareError::Disconnected`] is final. Everything else concerns
//! one tag or one exchange with it and clears up on a retry or the next
//! poll.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The device is gone or was closed.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The tag did not answer in time.
    #[error("No response from tag after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Frame-level failure between reader and tag (CRC, collision, NAK).
    #[error("Transceiver error: {message}")]
    Transceiver { message: String },

    /// The tag behind a handle has left the field.
    #[error("Tag {uid} left the field")]
    TagLost { uid: String },

    /// A UID the reader has never seen.
    #[error("Unknown tag {uid}")]
    UnknownTag { uid: String },

    /// Page index beyond the memory of the tag.
    #[error("Page {page} is out of range")]
    PageOutOfRange { page: u8 },

    /// The tag refused a page write.
    #[error("Write to page {page} rejected: {reason}")]
    WriteRejected { page: u8, reason: String },

    /// A page read failed.
    #[error("Read of page {page} failed: {message}")]
    ReadFailed { page: u8, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn transceiver(message: impl Into<String>) -> Self {
        Self::Transceiver {
            message: message.into(),
        }
    }

    pub fn tag_lost(uid: impl Into<String>) -> Self {
        Self::TagLost { uid: uid.into() }
    }

    pub fn unknown_tag(uid: impl Into<String>) -> Self {
        Self::UnknownTag { uid: uid.into() }
    }

    pub fn write_rejected(page: u8, reason: impl Into<String>) -> Self {
        Self::WriteRejected {
            page,
            reason: reason.into(),
        }
    }

    pub fn read_failed(page: u8, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            page,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Returns `true` for errors a retry or the next poll can recover from.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Disconnected { .. })
    }
}
