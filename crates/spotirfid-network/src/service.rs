//! The playback service contract.

#![allow(async_fn_in_trait)]

use spotirfid_core::{ResourceId, TargetId};

use crate::error::Result;
use crate::types::{AccessToken, NowPlaying, PlaybackTarget};

/// Remote service that starts playback of a resource on a target.
///
/// Implementations do no retrying of their own; the caller decides how to
/// react to each [`FailureClass`](crate::FailureClass).
pub trait PlaybackService: Send + Sync {
    /// Obtain a fresh access token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthorized`](crate::ServiceError::Unauthorized)
    /// if the stored credentials are rejected.
    async fn authorize(&mut self) -> Result<AccessToken>;

    /// Enumerate the playback targets currently advertised.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_targets(&self, token: &AccessToken) -> Result<Vec<PlaybackTarget>>;

    /// Start playback of `resource` on `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TargetNotFound`](crate::ServiceError::TargetNotFound)
    /// if the service no longer knows `target`.
    async fn start_playback(
        &self,
        token: &AccessToken,
        resource: &ResourceId,
        target: &TargetId,
    ) -> Result<()>;

    /// Query what is playing now. `None` means nothing is playing.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn currently_playing(&self, token: &AccessToken) -> Result<Option<NowPlaying>>;
}
