use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ldapwatch::check::Checker;
use ldapwatch::search::Snapshot;

/// Shared view of what a [`RecordingChecker`] saw.
#[derive(Clone, Default)]
pub struct CheckLog {
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl CheckLog {
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest number of `check` calls that were ever in flight at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Number of `check` calls running right now.
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Poll until at least `n` snapshots were recorded.
    pub async fn wait_for(&self, n: usize) {
        while self.len() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Checker that records every snapshot, optionally blocking in each call.
pub struct RecordingChecker {
    log: CheckLog,
    block_for: Option<Duration>,
}

impl RecordingChecker {
    pub fn new() -> (Self, CheckLog) {
        let log = CheckLog::default();
        (
            Self {
                log: log.clone(),
                block_for: None,
            },
            log,
        )
    }

    /// Block the calling thread this long inside every `check`.
    pub fn blocking(block_for: Duration) -> (Self, CheckLog) {
        let (mut checker, log) = Self::new();
        checker.block_for = Some(block_for);
        (checker, log)
    }
}

impl Checker for RecordingChecker {
    fn check(&mut self, snapshot: &Snapshot) {
        let now = self.log.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_active.fetch_max(now, Ordering::SeqCst);

        if let Some(block_for) = self.block_for {
            std::thread::sleep(block_for);
        }
        self.log.snapshots.lock().unwrap().push(snapshot.clone());

        self.log.active.fetch_sub(1, Ordering::SeqCst);
    }
}
