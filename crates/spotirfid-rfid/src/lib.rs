//! Tag memory access for the spotirfid bridge.
//!
//! [`TagMemoryAccessor`] stores a text payload in the user pages of an
//! Ultralight/NTAG tag and reads it back. Writes are verified by reading
//! back every data page and are retried as a whole sequence, never page by
//! page. Pages 0-3 (UID, lock bytes, capability container) are never
//! written.
//!
//! ```text
//!  page  0   1   2   3   4 ........................ 39
//!       [UID][UID][LCK][CC][ payload | 00 padding  ... ]
//!                          ^ start page (fixed or discovered)
//! ```

pub mod accessor;
pub mod error;
pub mod layout;
pub mod payload;

pub use accessor::{PageDump, TagDump, TagMemoryAccessor, WriteReceipt};
pub use error::{Result, TagError};
pub use layout::{StartPagePolicy, TagLayout, WritePolicy};
pub use payload::{decode_payload, encode_payload};
