//! Indicator that reports state changes through the log.

use spotirfid_hardware::{HardwareError, Indicator, Result};
use tracing::{debug, trace};

/// Stand-in for the status LED when no GPIO line is driven.
#[derive(Debug, Default)]
pub struct LogIndicator {
    on: bool,
    closed: bool,
}

impl Indicator for LogIndicator {
    async fn set(&mut self, on: bool) -> Result<()> {
        if self.closed {
            return Err(HardwareError::disconnected("log indicator"));
        }
        if on != self.on {
            trace!("Indicator {}", if on { "on" } else { "off" });
            self.on = on;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        debug!("Indicator released");
        self.closed = true;
        Ok(())
    }
}
