//! Values exchanged with the playback service.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spotirfid_core::{ResourceId, TargetId};

/// Short-lived bearer credential.
///
/// Expiry is recorded for diagnostics only; tokens are refreshed when the
/// service rejects them, not on a timer.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_in: Duration,
    obtained_at: chrono::DateTime<chrono::Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_in,
            obtained_at: chrono::Utc::now(),
        }
    }

    /// The bearer value.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }

    pub fn obtained_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.obtained_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// A playback endpoint advertised by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackTarget {
    pub id: TargetId,
    pub name: String,
    pub is_active: bool,

    /// Device type as reported by the service ("Speaker", "Computer", ...)
    pub kind: String,
}

impl PlaybackTarget {
    pub fn new(id: TargetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_active: false,
            kind: String::new(),
        }
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}

/// The resource currently playing, as captured for write-mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub resource: ResourceId,

    /// Human-readable name
    pub name: String,
}
