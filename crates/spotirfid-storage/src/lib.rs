//! Persistence for the spotirfid bridge.
//!
//! In the tag-map persistence mode, write-mode commits record a mapping
//! from tag UID to resource instead of programming tag memory. This crate
//! keeps that mapping in a JSON file that is replaced atomically on every
//! commit. Entries are never removed automatically.

mod error;
mod tag_map;

pub use error::{StorageError, StorageResult};
pub use tag_map::{TagMap, TagMapStore};
