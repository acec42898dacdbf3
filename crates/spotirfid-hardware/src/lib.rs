//! Hardware abstraction layer for the spotirfid bridge.
//!
//! This crate defines the two physical collaborators of the bridge, the
//! contactless tag reader and the status indicator, as traits. Mock
//! implementations with controllable state let every layer above be
//! exercised without hardware.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Page-addressed**: The reader exposes raw 4-byte pages. Payload
//!   encoding and verification live in `spotirfid-rfid`.
//! - **Error-aware**: All operations return `Result<T>` with detailed error
//!   information. [`HardwareError::is_transient`] separates failures worth
//!   retrying from a lost device.
//!
//! # Tag Readers
//!
//! ```no_run
//! use spotirfid_hardware::traits::TagReader;
//! use spotirfid_hardware::error::Result;
//!
//! async fn wait_for_tag<R: TagReader>(reader: &mut R) -> Result<String> {
//!     loop {
//!         if let Some(tag) = reader.detect_tag().await? {
//!             return Ok(tag.uid().to_string());
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(250)).await;
//!     }
//! }
//! ```
//!
//! # Indicators
//!
//! Indicators are shared between the control loop and the
//! [`IndicatorPulser`] task through [`SharedIndicator`].

pub mod error;
pub mod indicator;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use indicator::{IndicatorPulser, SharedIndicator, flash, shared};
pub use traits::{Indicator, TagReader};
pub use types::{LockState, PageData, ReaderInfo, TagHandle, ZERO_PAGE};
