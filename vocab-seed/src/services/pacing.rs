//! Inter-unit delay
//!
//! The delay is an async timer: the task yields to the runtime while it
//! waits instead of parking a worker thread.

use std::time::Duration;
use tracing::trace;

/// Fixed pause between consecutive units of work
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn from_millis(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait before the next unit; returns immediately when there is none
    pub async fn between(&self, has_next: bool) {
        if !has_next || self.delay.is_zero() {
            return;
        }
        trace!(delay_ms = self.delay.as_millis() as u64, "Pausing before next unit");
        tokio::time::sleep(self.delay).await;
    }
}
