//! Mock status indicator.
//!
//! Records every state change so tests can assert on the exact pattern the
//! bridge produced.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{HardwareError, Result, traits::Indicator};

#[derive(Debug, Default)]
struct IndicatorState {
    on: bool,
    history: Vec<bool>,
    closed: bool,
}

/// Mock indicator for testing and development.
///
/// # Examples
///
/// ```
/// use spotirfid_hardware::mock::MockIndicator;
/// use spotirfid_hardware::traits::Indicator;
///
/// #[tokio::main]
/// async fn main() -> spotirfid_hardware::Result<()> {
///     let (mut led, handle) = MockIndicator::new();
///     led.set(true).await?;
///     assert!(handle.is_on().await);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockIndicator {
    state: Arc<Mutex<IndicatorState>>,
}

impl MockIndicator {
    /// Create a new mock indicator, initially off.
    ///
    /// Returns a tuple of (MockIndicator, MockIndicatorHandle) where the
    /// handle observes the indicator.
    pub fn new() -> (Self, MockIndicatorHandle) {
        let state = Arc::new(Mutex::new(IndicatorState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockIndicatorHandle { state },
        )
    }
}

impl Indicator for MockIndicator {
    async fn set(&mut self, on: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(HardwareError::disconnected("Mock Indicator"));
        }
        state.on = on;
        state.history.push(on);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().await.closed = true;
        Ok(())
    }
}

/// Handle for observing a mock indicator.
#[derive(Debug, Clone)]
pub struct MockIndicatorHandle {
    state: Arc<Mutex<IndicatorState>>,
}

impl MockIndicatorHandle {
    /// Current state.
    pub async fn is_on(&self) -> bool {
        self.state.lock().await.on
    }

    /// Every state set so far, in order.
    pub async fn history(&self) -> Vec<bool> {
        self.state.lock().await.history.clone()
    }

    /// Forget the recorded history.
    pub async fn clear_history(&self) {
        self.state.lock().await.history.clear();
    }

    /// Returns `true` once the indicator has been closed.
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}
