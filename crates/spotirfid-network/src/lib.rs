//! Playback service layer for the spotirfid bridge.
//!
//! This crate defines the [`PlaybackService`] contract, an HTTP
//! implementation against the Spotify Web API and a scripted mock.
//!
//! # Components
//!
//! - **SpotifyClient**: refresh-token authorization, device enumeration,
//!   playback start and now-playing queries over HTTPS
//! - **MockPlaybackService**: in-memory service with a call log
//!
//! # Failure classes
//!
//! Every [`ServiceError`] maps to a [`FailureClass`] that tells the caller
//! whether re-resolving the target or re-authorizing can help.
//!
//! # Example
//!
//! ```no_run
//! use spotirfid_network::{PlaybackService, SpotifyClient, SpotifyConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SpotifyConfig::new("client-id", "client-secret", "refresh-token");
//! let mut client = SpotifyClient::new(config)?;
//!
//! let token = client.authorize().await?;
//! for target in client.list_targets(&token).await? {
//!     println!("{} ({})", target.name, target.id);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod mock;
mod service;
mod types;

pub use client::{DEFAULT_ACCOUNTS_URL, DEFAULT_API_URL, SpotifyClient, SpotifyConfig};
pub use error::{FailureClass, Result, ServiceError};
pub use service::PlaybackService;
pub use types::{AccessToken, NowPlaying, PlaybackTarget};
