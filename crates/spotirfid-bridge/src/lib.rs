//! The spotirfid bridge: tag scans in, playback out.
//!
//! A tag carrying a resource URI (or known by UID to the tag map) starts
//! playback of that resource on the configured target. The master tag
//! captures whatever is playing and the next tag presented records it.
//!
//! # Components
//!
//! - [`classify`]: turns a scan into a [`ScanOutcome`]
//! - [`ActionTargetResolver`]: target name to live target id
//! - [`ActionInvoker`]: playback with resolve-then-reauthorize retry
//! - [`ModeMachine`]: idle / write-mode with a bounded wait
//! - [`Bridge`]: the control loop tying the devices together
//!
//! # Example
//!
//! ```no_run
//! use spotirfid_bridge::{Bridge, BridgeConfig};
//! use spotirfid_core::MasterMarker;
//! use spotirfid_hardware::mock::{MockIndicator, MockTagReader};
//! use spotirfid_network::{SpotifyClient, SpotifyConfig};
//! use spotirfid_rfid::TagMemoryAccessor;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (reader, _tags) = MockTagReader::new();
//! let (indicator, _led) = MockIndicator::new();
//! let service = SpotifyClient::new(SpotifyConfig::new("id", "secret", "refresh"))?;
//! let config = BridgeConfig::new("Living Room", MasterMarker::new("MASTER_TAG")?);
//!
//! let mut bridge = Bridge::new(
//!     reader,
//!     indicator,
//!     service,
//!     TagMemoryAccessor::default(),
//!     None,
//!     config,
//! )?;
//! bridge.start().await?;
//!
//! let result = bridge.run(CancellationToken::new(), |outcome| println!("{outcome}")).await;
//! bridge.shutdown().await?;
//! result?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod invoker;
pub mod mode;
pub mod outcome;
pub mod resolver;
pub mod scan;

pub use bridge::Bridge;
pub use config::{BridgeConfig, PersistenceMode};
pub use error::{BridgeError, Result};
pub use invoker::{ActionFailure, ActionInvoker, InvokeOutcome};
pub use mode::{BridgeMode, ModeKind, ModeMachine};
pub use outcome::Outcome;
pub use resolver::ActionTargetResolver;
pub use scan::{ReferenceSource, ScanOutcome, classify};
