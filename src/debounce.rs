//! Quiet-period debouncing for bursts of change notifications.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Default quiet window for configuration file changes.
pub const CONFIG_DEBOUNCE: Duration = Duration::from_millis(100);

/// Collapses a burst of events into one batch.
///
/// A batch starts with the first event and ends once no further event has
/// arrived for `window`. Every event inside the burst restarts the window.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for the next burst and return how many events it contained.
    ///
    /// Returns `None` once the channel is closed and drained.
    pub async fn next<T>(&self, rx: &mut UnboundedReceiver<T>) -> Option<usize> {
        rx.recv().await?;
        let mut count = 1;
        loop {
            match tokio::time::timeout(self.window, rx.recv()).await {
                Ok(Some(_)) => count += 1,
                // Closed mid-burst: still deliver what was collected.
                Ok(None) => return Some(count),
                Err(_) => return Some(count),
            }
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(CONFIG_DEBOUNCE)
    }
}
