//! HTTP client for the Spotify Web API.
//!
//! # Architecture
//!
//! ```text
//! ActionInvoker
//!     │
//!     └─> SpotifyClient ──(HTTPS)──> accounts service  POST /api/token
//!                              └──> Web API           GET  /v1/me/player/devices
//!                                                     PUT  /v1/me/player/play
//!                                                     GET  /v1/me/player/currently-playing
//! ```
//!
//! The client is a thin transport: no retry, no token caching. Every request
//! is bounded by the configured timeout.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use spotirfid_core::constants::DEFAULT_HTTP_TIMEOUT_MS;
use spotirfid_core::{ResourceId, TargetId};
use tracing::{debug, info, trace, warn};

use crate::error::{Result, ServiceError};
use crate::service::PlaybackService;
use crate::types::{AccessToken, NowPlaying, PlaybackTarget};

/// Default accounts service base URL.
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Default Web API base URL.
pub const DEFAULT_API_URL: &str = "https://api.spotify.com";

/// Token lifetime assumed when the service does not report one.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Configuration for [`SpotifyClient`].
///
/// # Example
///
/// ```
/// use spotirfid_network::SpotifyConfig;
/// use std::time::Duration;
///
/// let config = SpotifyConfig::new("client-id", "client-secret", "refresh-token")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.api_url, "https://api.spotify.com");
/// ```
#[derive(Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,

    /// Long-lived credential from the out-of-band authorization step
    pub refresh_token: String,

    /// Accounts service base URL, without trailing slash
    pub accounts_url: String,

    /// Web API base URL, without trailing slash
    pub api_url: String,

    /// Timeout for every request
    pub timeout: Duration,
}

impl SpotifyConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
        }
    }

    pub fn with_accounts_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("accounts_url", &self.accounts_url)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<DeviceEntry>,
}

#[derive(Deserialize)]
struct DeviceEntry {
    id: Option<String>,
    name: String,
    #[serde(default)]
    is_active: bool,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Deserialize)]
struct CurrentlyPlayingResponse {
    item: Option<PlayingItem>,
}

#[derive(Deserialize)]
struct PlayingItem {
    uri: String,
    name: String,
    album: Option<NamedUri>,
}

#[derive(Deserialize)]
struct NamedUri {
    uri: String,
    name: String,
}

/// Playback service backed by the Spotify Web API.
pub struct SpotifyClient {
    http: reqwest::Client,
    config: SpotifyConfig,
}

impl SpotifyClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if the HTTP client cannot be built.
    pub fn new(config: SpotifyConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    /// Map an unsuccessful response to an error. 401 is always an
    /// authorization failure.
    async fn error_for(response: reqwest::Response) -> ServiceError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            ServiceError::Unauthorized { body }
        } else {
            ServiceError::Http {
                status: status.as_u16(),
                body,
            }
        }
    }
}

impl fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PlaybackService for SpotifyClient {
    async fn authorize(&mut self) -> Result<AccessToken> {
        let url = format!("{}/api/token", self.config.accounts_url);
        debug!("Requesting access token");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.config.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let token: TokenResponse = response.json().await.map_err(ServiceError::from_reqwest)?;
        if let Some(rotated) = token.refresh_token {
            info!("Refresh token rotated by the accounts service");
            self.config.refresh_token = rotated;
        }

        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        info!("Access token obtained (expires in {expires_in}s)");
        Ok(AccessToken::new(
            token.access_token,
            Duration::from_secs(expires_in),
        ))
    }

    async fn list_targets(&self, token: &AccessToken) -> Result<Vec<PlaybackTarget>> {
        let url = format!("{}/v1/me/player/devices", self.config.api_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let devices: DevicesResponse = response.json().await.map_err(ServiceError::from_reqwest)?;
        let targets: Vec<PlaybackTarget> = devices
            .devices
            .into_iter()
            .filter_map(|device| {
                let Some(id) = device.id.and_then(|id| TargetId::new(id).ok()) else {
                    trace!("Skipping device {:?} without id", device.name);
                    return None;
                };
                Some(PlaybackTarget {
                    id,
                    name: device.name,
                    is_active: device.is_active,
                    kind: device.kind,
                })
            })
            .collect();

        debug!("{} playback targets advertised", targets.len());
        Ok(targets)
    }

    async fn start_playback(
        &self,
        token: &AccessToken,
        resource: &ResourceId,
        target: &TargetId,
    ) -> Result<()> {
        let url = format!("{}/v1/me/player/play", self.config.api_url);
        let body = if resource.kind().is_context() {
            json!({ "context_uri": resource.as_str() })
        } else {
            json!({ "uris": [resource.as_str()] })
        };

        let response = self
            .http
            .put(&url)
            .query(&[("device_id", target.as_str())])
            .bearer_auth(token.secret())
            .json(&body)
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;

        match response.status().as_u16() {
            200 | 202 | 204 => {
                debug!("Playback of {resource} started on {target}");
                Ok(())
            }
            404 => {
                warn!("Target {target} not found");
                Err(ServiceError::TargetNotFound {
                    target: target.to_string(),
                })
            }
            _ => Err(Self::error_for(response).await),
        }
    }

    async fn currently_playing(&self, token: &AccessToken) -> Result<Option<NowPlaying>> {
        let url = format!("{}/v1/me/player/currently-playing", self.config.api_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: CurrentlyPlayingResponse =
            response.json().await.map_err(ServiceError::from_reqwest)?;
        let Some(item) = body.item else {
            return Ok(None);
        };

        let (uri, name) = match item.album {
            Some(album) => (album.uri, album.name),
            None => (item.uri, item.name),
        };
        let resource =
            ResourceId::new(&uri).map_err(|e| ServiceError::Parse(e.to_string()))?;

        Ok(Some(NowPlaying { resource, name }))
    }
}
