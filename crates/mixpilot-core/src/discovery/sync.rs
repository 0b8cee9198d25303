//! Full-sync progress tracking.
//!
//! The adapter event pump feeds every parameter update through
//! [`SyncProgress::note`]; a full sync is considered complete when one
//! Name update per channel and bus has been seen. Discovery waits on
//! that count with a deadline and proceeds on partial state if the
//! console is slow.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::console::adapter::ConsoleAdapter;
use crate::console::params::{ChannelParam, ParameterUpdate};

#[derive(Default)]
pub struct SyncProgress {
    names_seen: AtomicUsize,
}

impl SyncProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the event pump for every incoming update.
    pub fn note(&self, update: &ParameterUpdate) {
        if update.param == ChannelParam::Name {
            self.names_seen.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn reset(&self) {
        self.names_seen.store(0, Ordering::Relaxed);
    }

    pub fn names_seen(&self) -> usize {
        self.names_seen.load(Ordering::Relaxed)
    }
}

/// Request a full dump and block until `expected` Name updates arrive
/// or the deadline passes. Returns false on timeout.
pub fn perform_full_sync(
    adapter: &dyn ConsoleAdapter,
    progress: &SyncProgress,
    expected: usize,
    timeout: Duration,
) -> bool {
    log::info!("Starting full console sync ({} endpoints expected)", expected);
    progress.reset();
    adapter.request_full_sync();

    let deadline = Instant::now() + timeout;
    loop {
        let seen = progress.names_seen();
        if seen >= expected {
            log::info!("Full sync complete - {} endpoints received", seen);
            return true;
        }
        if Instant::now() >= deadline {
            log::warn!(
                "Full sync timed out after {:?} - proceeding with partial state ({}/{})",
                timeout,
                seen,
                expected
            );
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::params::ParameterUpdate;

    #[test]
    fn test_progress_counts_only_names() {
        let p = SyncProgress::new();
        p.note(&ParameterUpdate::channel_float(1, ChannelParam::Fader, 0.5));
        p.note(&ParameterUpdate::channel_name(1, "Kick"));
        p.note(&ParameterUpdate::channel_name(2, "Snare"));
        assert_eq!(p.names_seen(), 2);
        p.reset();
        assert_eq!(p.names_seen(), 0);
    }
}
