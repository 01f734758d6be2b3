// src/check/mod.rs

//! Change detection.
//!
//! A [`Checker`] receives every [`Snapshot`] of one watch, in order, on that
//! watch's own worker. The watcher keeps no history: a checker that wants to
//! diff remembers the previous snapshot itself. Because a checker is owned by
//! exactly one worker, it needs no internal locking.
//!
//! - [`NoopChecker`] ignores everything.
//! - Any `FnMut(&Snapshot) + Send` closure is a checker.
//! - [`DiffChecker`] keeps a baseline, compares with a [`Compare`] strategy and
//!   forwards a [`Change`] on a channel whenever the result set changed.

pub mod compare;
pub mod diff;

pub use compare::{Compare, Comparison};
pub use diff::{Change, ChangeSummary, DiffChecker};

use crate::search::Snapshot;

/// Observer invoked with each new snapshot of a watch.
pub trait Checker: Send {
    fn check(&mut self, snapshot: &Snapshot);
}

impl<F> Checker for F
where
    F: FnMut(&Snapshot) + Send,
{
    fn check(&mut self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

/// Checker that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopChecker;

impl Checker for NoopChecker {
    fn check(&mut self, _snapshot: &Snapshot) {}
}
