//! Shared value types, constants and errors for the SpotiRFID bridge.
//!
//! Every other crate in the workspace depends on this one for the
//! identifiers that flow between the tag reader, the playback service and
//! the bridge state machine.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
