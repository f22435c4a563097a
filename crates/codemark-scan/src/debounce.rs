//! Trailing-edge debounce for coalescing bursts of change events.
//!
//! Each trigger cancels the previously scheduled run and starts a fresh
//! quiet-window timer; the action runs once the window passes without a
//! new trigger. A reusable primitive rather than ad hoc timer juggling.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A cancellable scheduled task with reset-on-trigger semantics.
pub struct Debouncer {
    quiet: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Schedule `action` to run after the quiet window. Any previously
    /// scheduled run that has not fired yet is cancelled, so a burst of
    /// triggers results in exactly one run, timed from the last trigger.
    pub fn trigger<F, Fut>(&mut self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let quiet = self.quiet;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            action().await;
        }));
    }

    /// Cancel the pending run, if any. Used by manual refresh, which
    /// bypasses the quiet window and scans immediately.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a run is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
