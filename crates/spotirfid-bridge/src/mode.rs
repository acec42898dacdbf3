//! Bridge mode state machine.
//!
//! The bridge is either idle, turning scans into playback, or waiting for
//! a tag to record the resource captured when the master tag was scanned.
//!
//! # Transitions
//!
//! - Idle → WriteModePending (master tag, something playing)
//! - WriteModePending → WriteModePending (master tag again, restarts the timer)
//! - WriteModePending → Idle (write finished or timed out)
//!
//! Timing uses [`tokio::time::Instant`] so a paused test clock drives the
//! timeout.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use spotirfid_bridge::mode::{ModeKind, ModeMachine};
//! use spotirfid_core::ResourceId;
//! use spotirfid_network::NowPlaying;
//!
//! let mut machine = ModeMachine::new(Duration::from_secs(10));
//! let playing = NowPlaying {
//!     resource: ResourceId::new("spotify:album:6jbtHi5R0jMXoliU2OS0lo").unwrap(),
//!     name: "Album".into(),
//! };
//!
//! machine.enter_write_mode(playing);
//! assert_eq!(machine.kind(), ModeKind::WriteModePending);
//!
//! let captured = machine.finish_write().unwrap();
//! assert_eq!(captured.name, "Album");
//! assert_eq!(machine.kind(), ModeKind::Idle);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use spotirfid_network::NowPlaying;
use tokio::time::Instant;
use tracing::{debug, info};

/// Maximum number of mode transitions kept for diagnostics.
const MAX_HISTORY_SIZE: usize = 100;

/// Current mode together with its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMode {
    Idle,

    /// Waiting for a tag to receive the captured resource.
    WriteModePending { resource: NowPlaying },
}

impl BridgeMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Idle => ModeKind::Idle,
            Self::WriteModePending { .. } => ModeKind::WriteModePending,
        }
    }
}

/// Data-free view of a [`BridgeMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Idle,
    WriteModePending,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::WriteModePending => f.write_str("WriteModePending"),
        }
    }
}

/// One recorded mode change.
#[derive(Debug, Clone)]
pub struct ModeTransition {
    pub from: ModeKind,
    pub to: ModeKind,
    pub timestamp: Instant,
}

impl ModeTransition {
    fn new(from: ModeKind, to: ModeKind) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Tracks the bridge mode and the write-mode deadline.
///
/// Not shared: only the control loop touches it.
#[derive(Debug)]
pub struct ModeMachine {
    mode: BridgeMode,
    mode_entered_at: Instant,
    history: VecDeque<ModeTransition>,
    write_mode_timeout: Duration,
}

impl ModeMachine {
    pub fn new(write_mode_timeout: Duration) -> Self {
        Self {
            mode: BridgeMode::Idle,
            mode_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            write_mode_timeout,
        }
    }

    pub fn mode(&self) -> &BridgeMode {
        &self.mode
    }

    pub fn kind(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.mode, BridgeMode::WriteModePending { .. })
    }

    /// Resource waiting to be written, if any.
    pub fn pending_resource(&self) -> Option<&NowPlaying> {
        match &self.mode {
            BridgeMode::WriteModePending { resource } => Some(resource),
            BridgeMode::Idle => None,
        }
    }

    pub fn time_in_current_mode(&self) -> Duration {
        self.mode_entered_at.elapsed()
    }

    /// Returns `true` once write-mode has waited past its timeout.
    pub fn has_timed_out(&self) -> bool {
        self.is_pending() && self.time_in_current_mode() >= self.write_mode_timeout
    }

    /// Time left before write-mode expires. `None` when idle or expired.
    pub fn time_remaining(&self) -> Option<Duration> {
        if !self.is_pending() {
            return None;
        }
        self.write_mode_timeout
            .checked_sub(self.time_in_current_mode())
            .filter(|left| !left.is_zero())
    }

    /// Capture `resource` and wait for a tag.
    ///
    /// Calling this while already pending replaces the resource and restarts
    /// the timer.
    pub fn enter_write_mode(&mut self, resource: NowPlaying) {
        info!(
            "Write mode: waiting {}s for a tag to record {}",
            self.write_mode_timeout.as_secs(),
            resource.resource
        );
        self.change_mode(BridgeMode::WriteModePending { resource });
    }

    /// Leave write-mode after a write attempt, returning the captured resource.
    pub fn finish_write(&mut self) -> Option<NowPlaying> {
        self.take_pending()
    }

    /// Return to idle if write-mode has timed out.
    ///
    /// Returns the resource that was abandoned.
    pub fn expire_if_timed_out(&mut self) -> Option<NowPlaying> {
        if !self.has_timed_out() {
            return None;
        }
        let resource = self.take_pending()?;
        info!("Write mode timed out, {} not recorded", resource.resource);
        Some(resource)
    }

    pub fn history(&self) -> &VecDeque<ModeTransition> {
        &self.history
    }

    /// The last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<ModeTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    fn take_pending(&mut self) -> Option<NowPlaying> {
        match std::mem::replace(&mut self.mode, BridgeMode::Idle) {
            BridgeMode::WriteModePending { resource } => {
                self.record(ModeKind::WriteModePending, ModeKind::Idle);
                Some(resource)
            }
            BridgeMode::Idle => None,
        }
    }

    fn change_mode(&mut self, mode: BridgeMode) {
        let from = self.mode.kind();
        let to = mode.kind();
        self.mode = mode;
        self.record(from, to);
    }

    fn record(&mut self, from: ModeKind, to: ModeKind) {
        debug!("Mode {from} -> {to}");
        self.mode_entered_at = Instant::now();

        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(ModeTransition::new(from, to));
    }
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new(Duration::from_secs(
            spotirfid_core::constants::DEFAULT_WRITE_MODE_TIMEOUT_SECS,
        ))
    }
}
