//! Bridge configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spotirfid_core::MasterMarker;
use spotirfid_core::constants::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_PULSE_PERIOD_MS, DEFAULT_WRITE_MODE_TIMEOUT_SECS,
    SUCCESS_FLASH_COUNT, SUCCESS_FLASH_PERIOD_MS,
};

/// Where a write-mode commit records the captured resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistenceMode {
    /// Program the resource into the tag's memory.
    #[default]
    TagMemory,

    /// Record a UID to resource mapping in the tag map file.
    TagMap,
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagMemory => f.write_str("tag-memory"),
            Self::TagMap => f.write_str("tag-map"),
        }
    }
}

impl FromStr for PersistenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tag-memory" => Ok(Self::TagMemory),
            "tag-map" => Ok(Self::TagMap),
            other => Err(format!(
                "unknown persistence mode {other:?} (expected tag-memory or tag-map)"
            )),
        }
    }
}

/// Bridge configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use spotirfid_bridge::{BridgeConfig, PersistenceMode};
/// use spotirfid_core::MasterMarker;
///
/// let config = BridgeConfig::new("Living Room", MasterMarker::new("MASTER_TAG").unwrap())
///     .with_persistence(PersistenceMode::TagMap)
///     .with_write_mode_timeout(Duration::from_secs(30));
/// assert_eq!(config.poll_interval, Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Human-readable name of the playback target
    pub target_name: String,

    pub master_marker: MasterMarker,
    pub persistence: PersistenceMode,

    /// Pause between presence polls
    pub poll_interval: Duration,

    /// How long write-mode waits for a tag
    pub write_mode_timeout: Duration,

    /// Indicator half-period while writing
    pub pulse_period: Duration,

    pub flash_count: u32,
    pub flash_period: Duration,
}

impl BridgeConfig {
    pub fn new(target_name: impl Into<String>, master_marker: MasterMarker) -> Self {
        Self {
            target_name: target_name.into(),
            master_marker,
            persistence: PersistenceMode::default(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            write_mode_timeout: Duration::from_secs(DEFAULT_WRITE_MODE_TIMEOUT_SECS),
            pulse_period: Duration::from_millis(DEFAULT_PULSE_PERIOD_MS),
            flash_count: SUCCESS_FLASH_COUNT,
            flash_period: Duration::from_millis(SUCCESS_FLASH_PERIOD_MS),
        }
    }

    pub fn with_persistence(mut self, persistence: PersistenceMode) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_write_mode_timeout(mut self, timeout: Duration) -> Self {
        self.write_mode_timeout = timeout;
        self
    }

    pub fn with_pulse_period(mut self, period: Duration) -> Self {
        self.pulse_period = period;
        self
    }

    pub fn with_flash(mut self, count: u32, period: Duration) -> Self {
        self.flash_count = count;
        self.flash_period = period;
        self
    }
}
