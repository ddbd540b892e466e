//! Progress reporting for long-running library operations.

/// Receiver of progress updates from scan, catalog refresh and organize.
///
/// Reports are fire-and-forget; implementations must not block.
pub trait ProgressSink: Send + Sync {
    /// Called after each unit of work (`current` is 1-based).
    fn report(&self, current: usize, total: usize, message: &str);
}

/// A no-op progress reporter that discards all updates.
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn report(&self, _current: usize, _total: usize, _message: &str) {}
}

/// A progress reporter that logs to the `log` crate.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, current: usize, total: usize, message: &str) {
        if current.is_multiple_of(100) || current == total || current == 1 {
            log::info!("  [{}/{}] {}", current, total, message);
        } else {
            log::debug!("  [{}/{}] {}", current, total, message);
        }
    }
}
