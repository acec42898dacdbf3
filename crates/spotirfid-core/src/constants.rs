//! Core constants for the tag-actuation bridge.
//!
//! This module collects the fixed values of the reference tag family
//! (MIFARE Ultralight / NTAG21x) together with the default timings and
//! retry bounds used by the bridge.
//!
//! # Tag Memory Layout
//!
//! Tags of the reference family expose their memory as 4-byte pages:
//!
//! ```text
//! page 0..=1   UID and check bytes
//! page 2       UID check byte, internal byte, static lock bytes (2-3)
//! page 3       capability container (one-time programmable)
//! page 4..     user memory
//! ```
//!
//! Pages `0..RESERVED_PAGES` are never targeted by a user write.
//!
//! # Usage
//!
//! ```
//! use spotirfid_core::constants::*;
//!
//! assert_eq!(PAGE_SIZE, 4);
//! assert!(FIRST_USER_PAGE >= RESERVED_PAGES);
//!
//! use std::time::Duration;
//! let poll = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
//! assert!(poll < Duration::from_secs(1));
//! ```

// ============================================================================
// Tag Memory
// ============================================================================

/// Size of one addressable tag page in bytes.
pub const PAGE_SIZE: usize = 4;

/// Number of leading pages holding UID, lock bytes and capability container.
///
/// These pages are metadata and must never receive user data.
pub const RESERVED_PAGES: u8 = 4;

/// First user-writable page of the reference tag family.
pub const FIRST_USER_PAGE: u8 = 4;

/// Last user-writable page of an NTAG213 (144 bytes of user memory).
pub const NTAG213_LAST_USER_PAGE: u8 = 39;

/// Page holding the static lock bytes.
pub const LOCK_PAGE: u8 = 2;

/// Minimum UID length in bytes (ISO 14443 single size UID).
pub const MIN_UID_LENGTH: usize = 4;

/// Maximum UID length in bytes (ISO 14443 triple size UID).
pub const MAX_UID_LENGTH: usize = 10;

// ============================================================================
// Retry Bounds
// ============================================================================

/// Number of full write-and-verify attempts before giving up on a tag.
pub const DEFAULT_WRITE_ATTEMPTS: u32 = 3;

/// Upper bound on playback invocations per scan event.
///
/// Direct call, retry after target re-resolution, retry after
/// re-authorization.
pub const MAX_INVOKE_ATTEMPTS: u32 = 3;

// ============================================================================
// Timings
// ============================================================================

/// Interval between tag presence polls in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// How long write-mode waits for a tag before returning to idle, in seconds.
pub const DEFAULT_WRITE_MODE_TIMEOUT_SECS: u64 = 10;

/// Delay between write attempts in milliseconds.
pub const DEFAULT_WRITE_RETRY_DELAY_MS: u64 = 200;

/// Half-period of the write-mode indicator pulse in milliseconds.
pub const DEFAULT_PULSE_PERIOD_MS: u64 = 150;

/// Number of flashes signalling a completed success.
pub const SUCCESS_FLASH_COUNT: u32 = 2;

/// Half-period of a success flash in milliseconds.
pub const SUCCESS_FLASH_PERIOD_MS: u64 = 100;

/// Per-request timeout for the playback service in milliseconds.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

// ============================================================================
// Markers
// ============================================================================

/// Payload that marks the master tag.
pub const DEFAULT_MASTER_MARKER: &str = "MASTER_TAG";

/// URI scheme of playable resources.
pub const RESOURCE_SCHEME: &str = "spotify";
