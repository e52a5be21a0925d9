//! Progress signals emitted by the fetch and ranking stages.

use std::time::Duration;

/// Receives liveness signals from long-running pipeline stages.
///
/// The pipeline only defines the signal contract; rendering is up to the
/// implementation, so the core stays testable without a terminal.
pub trait ProgressObserver: Send + Sync {
    /// One page request is about to be attempted (retries included).
    fn page_attempt(&self);
    /// The registry throttled the last attempt; the fetch waits `delay`
    /// before retrying the same page.
    fn throttled(&self, delay: Duration);
    /// The full company list is available, loaded or read from a snapshot.
    fn load_complete(&self, total: usize);
    /// Cumulative ranking progress in percent. Fires when a record crosses a
    /// reporting threshold and exactly once with 100 at the end.
    fn scoring_progress(&self, percent: u8);
}

/// Observer that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn page_attempt(&self) {}
    fn throttled(&self, _delay: Duration) {}
    fn load_complete(&self, _total: usize) {}
    fn scoring_progress(&self, _percent: u8) {}
}

/// Observer that renders signals through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn page_attempt(&self) {
        log::debug!("Requesting next company page");
    }

    fn throttled(&self, delay: Duration) {
        log::warn!("Registry throttled the request; waiting {delay:?} before retrying");
    }

    fn load_complete(&self, total: usize) {
        log::info!("Company list ready: {total} companies");
    }

    fn scoring_progress(&self, percent: u8) {
        log::info!("Scoring companies: {percent}%");
    }
}
