//! Common types shared across reader implementations.
//!
//! This module defines the page representation, the handle of a tag
//! currently in the field, the decoded lock state and reader metadata.

use serde::{Deserialize, Serialize};
use spotirfid_core::TagUid;
use spotirfid_core::constants::PAGE_SIZE;

/// Contents of one tag page.
pub type PageData = [u8; PAGE_SIZE];

/// A page holding only zero bytes.
pub const ZERO_PAGE: PageData = [0; PAGE_SIZE];

/// Handle of a tag present in the reader field.
///
/// A handle is valid for one presentation only. Each time a tag enters the
/// field the reader assigns a new session number, and operations through a
/// handle from an earlier session fail with
/// [`HardwareError::TagLost`](crate::HardwareError::TagLost).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHandle {
    uid: TagUid,
    session: u64,
    detected_at: chrono::DateTime<chrono::Utc>,
}

impl TagHandle {
    /// Create a handle for the given UID and presentation session.
    pub fn new(uid: TagUid, session: u64) -> Self {
        Self {
            uid,
            session,
            detected_at: chrono::Utc::now(),
        }
    }

    /// UID of the tag.
    pub fn uid(&self) -> &TagUid {
        &self.uid
    }

    /// Presentation session this handle belongs to.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// When the tag was detected.
    pub fn detected_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.detected_at
    }
}

/// Static lock state of an Ultralight/NTAG tag.
///
/// Decoded from bytes 2 and 3 of page 2. The view is advisory: a write to a
/// locked page is expected to be rejected by the tag, which callers treat
/// as an ordinary write failure.
///
/// ```text
/// lock byte 0: bit 3..=7 lock pages 3..=7 (bits 0..=2 are block-locks)
/// lock byte 1: bit 0..=7 lock pages 8..=15
/// ```
///
/// Pages above 15 are governed by dynamic lock bytes and report unlocked.
///
/// # Examples
///
/// ```
/// use spotirfid_hardware::types::LockState;
///
/// let state = LockState::from_lock_page(&[0x04, 0x88, 0b0001_0000, 0b0000_0001]);
/// assert!(state.is_locked(4));
/// assert!(state.is_locked(8));
/// assert!(!state.is_locked(5));
/// assert!(!state.is_locked(20));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockState {
    bytes: [u8; 2],
}

impl LockState {
    /// A state with no page locked.
    pub const UNLOCKED: Self = Self { bytes: [0, 0] };

    /// Decode the lock bytes from the contents of page 2.
    pub fn from_lock_page(page: &PageData) -> Self {
        Self {
            bytes: [page[2], page[3]],
        }
    }

    /// Raw lock bytes.
    pub fn bytes(&self) -> [u8; 2] {
        self.bytes
    }

    /// Returns `true` if the static lock bits protect `page`.
    pub fn is_locked(&self, page: u8) -> bool {
        match page {
            3..=7 => self.bytes[0] & (1 << page) != 0,
            8..=15 => self.bytes[1] & (1 << (page - 8)) != 0,
            _ => false,
        }
    }

    /// Returns `true` if any page is locked.
    pub fn any_locked(&self) -> bool {
        self.bytes[0] & 0b1111_1000 != 0 || self.bytes[1] != 0
    }

    /// Lock bytes with the bit for `page` set.
    ///
    /// Pages outside 3..=15 have no static lock bit and are left unchanged.
    pub fn with_locked(mut self, page: u8) -> Self {
        match page {
            3..=7 => self.bytes[0] |= 1 << page,
            8..=15 => self.bytes[1] |= 1 << (page - 8),
            _ => {}
        }
        self
    }
}

/// Tag reader information.
///
/// Contains reader-specific metadata such as supported protocols
/// and maximum baud rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderInfo {
    /// Reader name (e.g., "MFRC522").
    pub name: String,

    /// List of supported protocols (e.g., ["ISO14443A"]).
    pub protocols: Vec<String>,

    /// Maximum supported baud rate in bits per second.
    pub max_baud_rate: Option<u32>,
}

impl ReaderInfo {
    /// Create a new ReaderInfo.
    pub fn new(name: impl Into<String>, protocols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            protocols,
            max_baud_rate: None,
        }
    }

    /// Set the maximum baud rate.
    pub fn with_max_baud_rate(mut self, max_baud_rate: u32) -> Self {
        self.max_baud_rate = Some(max_baud_rate);
        self
    }
}
