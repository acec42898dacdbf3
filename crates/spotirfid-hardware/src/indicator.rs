//! Indicator patterns: success flashes and the write-mode pulser.
//!
//! The pulser runs on its own task so a blocking write attempt on the
//! control loop does not starve the visual feedback. It is never detached:
//! [`IndicatorPulser::stop`] signals it and waits for it to finish, and
//! dropping a pulser without stopping it still cancels the task.
//!
//! ```text
//!   control loop                     pulser task
//!   ────────────                     ───────────
//!   IndicatorPulser::start ────────► on / off / on / ...
//!   write attempt ...                     │
//!   pulser.stop().await ──cancel───►      │
//!        │                           set(false), exit
//!        ◄──────────────join───────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace};

use crate::error::{HardwareError, Result};
use crate::traits::Indicator;

/// Indicator shared between the control loop and the pulser task.
pub type SharedIndicator<I> = Arc<Mutex<I>>;

/// Wrap an indicator for sharing with a pulser.
pub fn shared<I: Indicator>(indicator: I) -> SharedIndicator<I> {
    Arc::new(Mutex::new(indicator))
}

/// Flash the indicator `times` times with the given half-period.
///
/// Leaves the indicator off.
///
/// # Errors
///
/// Returns the first error reported by the indicator.
pub async fn flash<I: Indicator>(
    indicator: &SharedIndicator<I>,
    times: u32,
    period: Duration,
) -> Result<()> {
    let mut indicator = indicator.lock().await;
    for _ in 0..times {
        indicator.set(true).await?;
        tokio::time::sleep(period).await;
        indicator.set(false).await?;
        tokio::time::sleep(period).await;
    }
    Ok(())
}

/// Background task toggling an indicator until stopped.
#[derive(Debug)]
pub struct IndicatorPulser {
    guard: DropGuard,
    task: JoinHandle<Result<()>>,
}

impl IndicatorPulser {
    /// Start pulsing with the given half-period.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use spotirfid_hardware::indicator::{IndicatorPulser, shared};
    /// use spotirfid_hardware::mock::MockIndicator;
    ///
    /// #[tokio::main]
    /// async fn main() -> spotirfid_hardware::Result<()> {
    ///     let (indicator, handle) = MockIndicator::new();
    ///     let indicator = shared(indicator);
    ///
    ///     let pulser = IndicatorPulser::start(indicator.clone(), Duration::from_millis(5));
    ///     tokio::time::sleep(Duration::from_millis(20)).await;
    ///     pulser.stop().await?;
    ///
    ///     assert!(!handle.is_on().await);
    ///     Ok(())
    /// }
    /// ```
    pub fn start<I: Indicator>(indicator: SharedIndicator<I>, period: Duration) -> Self {
        let token = CancellationToken::new();
        let task = tokio::spawn(pulse_until_cancelled(indicator, period, token.clone()));
        debug!("Indicator pulser started ({}ms)", period.as_millis());

        Self {
            guard: token.drop_guard(),
            task,
        }
    }

    /// Signal the pulser to stop and wait for it to finish.
    ///
    /// The indicator is off once this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if the indicator failed while pulsing or the task
    /// panicked.
    pub async fn stop(self) -> Result<()> {
        self.guard.disarm().cancel();

        match self.task.await {
            Ok(result) => {
                debug!("Indicator pulser stopped");
                result
            }
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(HardwareError::other(format!(
                "Indicator pulser panicked: {e}"
            ))),
        }
    }
}

async fn pulse_until_cancelled<I: Indicator>(
    indicator: SharedIndicator<I>,
    period: Duration,
    token: CancellationToken,
) -> Result<()> {
    let mut on = true;
    loop {
        indicator.lock().await.set(on).await?;
        trace!("Pulse {}", if on { "on" } else { "off" });
        on = !on;

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }
    }

    indicator.lock().await.set(false).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockIndicator;

    #[tokio::test(start_paused = true)]
    async fn test_flash_toggles_and_ends_off() {
        let (indicator, handle) = MockIndicator::new();
        let indicator = shared(indicator);

        flash(&indicator, 2, Duration::from_millis(100)).await.unwrap();

        assert_eq!(handle.history().await, vec![true, false, true, false]);
        assert!(!handle.is_on().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulser_toggles_until_stopped() {
        let (indicator, handle) = MockIndicator::new();
        let indicator = shared(indicator);

        let pulser = IndicatorPulser::start(indicator.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(450)).await;
        pulser.stop().await.unwrap();

        let history = handle.history().await;
        assert!(history.len() >= 4, "expected several toggles, got {history:?}");
        assert!(history[0]);
        assert!(!history[1]);
        assert_eq!(history.last(), Some(&false));
        assert!(!handle.is_on().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulser_stop_is_a_join() {
        let (indicator, handle) = MockIndicator::new();
        let indicator = shared(indicator);

        let pulser = IndicatorPulser::start(indicator.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(50)).await;
        pulser.stop().await.unwrap();

        let settled = handle.history().await.len();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.history().await.len(), settled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_pulser_is_cancelled() {
        let (indicator, handle) = MockIndicator::new();
        let indicator = shared(indicator);

        let pulser = IndicatorPulser::start(indicator.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(pulser);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let settled = handle.history().await.len();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.history().await.len(), settled);
        assert!(!handle.is_on().await);
    }
}
