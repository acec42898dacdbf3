//! Command line and environment configuration.
//!
//! Every option can be given as a flag or an environment variable; a
//! `.env` file is loaded first. Options are global so they may appear
//! before or after the subcommand.

use std::path::PathBuf;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use spotirfid_bridge::{BridgeConfig, PersistenceMode};
use spotirfid_core::MasterMarker;
use spotirfid_core::constants::{
    DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_MASTER_MARKER, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WRITE_ATTEMPTS, DEFAULT_WRITE_MODE_TIMEOUT_SECS, FIRST_USER_PAGE,
    NTAG213_LAST_USER_PAGE,
};
use spotirfid_network::{DEFAULT_ACCOUNTS_URL, DEFAULT_API_URL, SpotifyConfig};
use spotirfid_rfid::{StartPagePolicy, TagLayout, TagMemoryAccessor, WritePolicy};

/// Tag-triggered playback bridge.
#[derive(Parser, Debug)]
#[command(name = "spotirfid")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fallback log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, env = "SPOTIRFID_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub bridge: BridgeArgs,

    #[command(flatten)]
    pub tag: TagArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the bridge (default)
    Run,

    /// Write the master marker onto the next presented tag
    WriteMaster {
        /// Seconds to wait for a tag
        #[arg(long, default_value_t = 30)]
        wait_secs: u64,
    },

    /// Print every page of the next presented tag
    Dump {
        /// Seconds to wait for a tag
        #[arg(long, default_value_t = 30)]
        wait_secs: u64,
    },

    /// Zero the unlocked user memory of the next presented tag
    Wipe {
        /// Seconds to wait for a tag
        #[arg(long, default_value_t = 30)]
        wait_secs: u64,
    },
}

/// Playback service credentials and endpoints.
#[derive(clap::Args, Debug, Clone)]
pub struct ServiceArgs {
    #[arg(long, env = "SPOTIFY_CLIENT_ID", global = true, hide_env_values = true)]
    pub client_id: Option<String>,

    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    #[arg(long, env = "SPOTIFY_REFRESH_TOKEN", global = true, hide_env_values = true)]
    pub refresh_token: Option<String>,

    #[arg(long, env = "SPOTIFY_ACCOUNTS_URL", default_value = DEFAULT_ACCOUNTS_URL, global = true)]
    pub accounts_url: String,

    #[arg(long, env = "SPOTIFY_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "SPOTIRFID_HTTP_TIMEOUT_MS", default_value_t = DEFAULT_HTTP_TIMEOUT_MS, global = true)]
    pub http_timeout_ms: u64,
}

/// Control loop settings.
#[derive(clap::Args, Debug, Clone)]
pub struct BridgeArgs {
    /// Name of the playback device, matched case-insensitively
    #[arg(long, env = "SPOTIRFID_TARGET_DEVICE", global = true)]
    pub target_device: Option<String>,

    #[arg(long, env = "SPOTIRFID_MASTER_MARKER", default_value = DEFAULT_MASTER_MARKER, global = true)]
    pub master_marker: String,

    /// Where write-mode records the captured resource (tag-memory, tag-map)
    #[arg(long, env = "SPOTIRFID_PERSISTENCE", default_value = "tag-memory", global = true)]
    pub persistence: PersistenceMode,

    #[arg(long, env = "SPOTIRFID_TAG_MAP", default_value = "tag_map.json", global = true)]
    pub tag_map: PathBuf,

    #[arg(long, env = "SPOTIRFID_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS, global = true)]
    pub poll_interval_ms: u64,

    #[arg(long, env = "SPOTIRFID_WRITE_MODE_TIMEOUT_SECS", default_value_t = DEFAULT_WRITE_MODE_TIMEOUT_SECS, global = true)]
    pub write_mode_timeout_secs: u64,
}

/// Tag memory layout and write policy.
#[derive(clap::Args, Debug, Clone)]
pub struct TagArgs {
    #[arg(long, env = "SPOTIRFID_WRITE_ATTEMPTS", default_value_t = DEFAULT_WRITE_ATTEMPTS, global = true)]
    pub write_attempts: u32,

    #[arg(long, env = "SPOTIRFID_START_PAGE", value_enum, default_value_t = StartPage::Fixed, global = true)]
    pub start_page: StartPage,

    #[arg(long, env = "SPOTIRFID_LAST_USER_PAGE", default_value_t = NTAG213_LAST_USER_PAGE, global = true)]
    pub last_user_page: u8,
}

/// Start page selection for writes.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPage {
    /// The first user page
    Fixed,
    /// The first non-empty, unlocked user page
    Discover,
}

impl Cli {
    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// # Errors
    ///
    /// Returns a missing-argument error naming the absent credential.
    pub fn spotify_config(&self) -> Result<SpotifyConfig, clap::Error> {
        let service = &self.service;
        let config = SpotifyConfig::new(
            require(&service.client_id, "SPOTIFY_CLIENT_ID")?,
            require(&service.client_secret, "SPOTIFY_CLIENT_SECRET")?,
            require(&service.refresh_token, "SPOTIFY_REFRESH_TOKEN")?,
        )
        .with_accounts_url(service.accounts_url.clone())
        .with_api_url(service.api_url.clone())
        .with_timeout(Duration::from_millis(service.http_timeout_ms));
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if the target device is missing or the master
    /// marker is unusable.
    pub fn bridge_config(&self) -> Result<BridgeConfig, clap::Error> {
        let args = &self.bridge;
        let target = require(&args.target_device, "SPOTIRFID_TARGET_DEVICE")?;

        Ok(BridgeConfig::new(target, self.master_marker()?)
            .with_persistence(args.persistence)
            .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
            .with_write_mode_timeout(Duration::from_secs(args.write_mode_timeout_secs)))
    }

    /// # Errors
    ///
    /// Returns an error if the marker is empty or contains a NUL byte.
    pub fn master_marker(&self) -> Result<MasterMarker, clap::Error> {
        MasterMarker::new(self.bridge.master_marker.clone())
            .map_err(|e| Self::command_error(ErrorKind::ValueValidation, e))
    }

    /// # Errors
    ///
    /// Returns an error if the last user page lies inside the reserved pages.
    pub fn accessor(&self) -> Result<TagMemoryAccessor, clap::Error> {
        let tag = &self.tag;
        let layout = TagLayout::new(FIRST_USER_PAGE, tag.last_user_page)
            .map_err(|e| Self::command_error(ErrorKind::ValueValidation, e))?;
        let start_page = match tag.start_page {
            StartPage::Fixed => StartPagePolicy::Fixed(FIRST_USER_PAGE),
            StartPage::Discover => StartPagePolicy::Discover,
        };
        let policy = WritePolicy::default()
            .with_max_attempts(tag.write_attempts)
            .with_start_page(start_page);

        Ok(TagMemoryAccessor::new(layout, policy))
    }

    fn command_error(kind: ErrorKind, message: impl std::fmt::Display) -> clap::Error {
        <Self as CommandFactory>::command().error(kind, message)
    }
}

fn require(value: &Option<String>, name: &str) -> Result<String, clap::Error> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(Cli::command_error(
            ErrorKind::MissingRequiredArgument,
            format!("{name} is not set (flag --{})", flag_name(name)),
        )),
    }
}

/// `SPOTIFY_CLIENT_ID` -> `client-id`
fn flag_name(env: &str) -> String {
    let name = env
        .strip_prefix("SPOTIFY_")
        .or_else(|| env.strip_prefix("SPOTIRFID_"))
        .unwrap_or(env);
    name.to_ascii_lowercase().replace('_', "-")
}
