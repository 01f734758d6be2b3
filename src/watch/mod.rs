// src/watch/mod.rs

//! Polling scheduler.
//!
//! This module is responsible for:
//! - Registering watched queries together with their checkers.
//! - Running one worker per watch that executes its query on every tick and
//!   hands the snapshot to the checker.
//! - Driving all workers from a single timer via a fan-out task.
//! - Stopping everything with a barrier: `stop` returns once every worker
//!   has exited.
//!
//! It does **not** know anything about LDAP or about what counts as a
//! change; both are supplied by the caller.

pub mod fanout;
pub mod watcher;
pub mod worker;

pub use watcher::{
    Watcher, WatcherBuilder, DEFAULT_INTERVAL, DEFAULT_QUERY_TIMEOUT, MAX_DURATION,
};
pub use worker::{Watch, WatchId};

use std::time::Instant;

/// One scheduled execution opportunity, delivered to every watch.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Monotonic tick counter, starting at 1.
    pub seq: u64,
    /// When the timer expired; a worker busy with the previous tick sees
    /// this lag behind.
    pub fired_at: Instant,
}
