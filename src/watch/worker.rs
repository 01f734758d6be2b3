// src/watch/worker.rs

//! Per-watch worker loop.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace};

use super::Tick;
use crate::check::Checker;
use crate::search::{observe, Query, Searcher, Snapshot};

/// Identifier handed out by [`Watcher::add`](super::Watcher::add), in
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub(crate) usize);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered query and the checker that observes it.
pub struct Watch {
    id: WatchId,
    query: Query,
    checker: Box<dyn Checker>,
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("id", &self.id)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl Watch {
    pub(crate) fn new(id: WatchId, query: Query, checker: Box<dyn Checker>) -> Self {
        Self { id, query, checker }
    }

    pub fn id(&self) -> WatchId {
        self.id
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

/// Channels and settings a worker runs with.
pub(crate) struct WorkerContext {
    pub searcher: Arc<dyn Searcher>,
    pub query_timeout: Option<Duration>,
    pub tick_rx: mpsc::Receiver<Tick>,
    pub done_rx: oneshot::Receiver<()>,
}

/// Wait for a tick or the stop signal; on a tick, run the query and hand the
/// snapshot to the checker; repeat.
///
/// The stop signal wins when both are ready. A tick that arrives while the
/// checker is still busy stays in the channel (capacity 1), so a slow
/// checker delays ticks instead of running concurrently with itself.
pub(crate) async fn run_worker(watch: Watch, ctx: WorkerContext) {
    let Watch { id, query, checker } = watch;
    let WorkerContext {
        searcher,
        query_timeout,
        mut tick_rx,
        mut done_rx,
    } = ctx;
    let mut checker = checker;

    debug!(watch = %id, query = %query, "watch worker waiting for ticks");

    loop {
        let tick = tokio::select! {
            biased;
            _ = &mut done_rx => break,
            tick = tick_rx.recv() => match tick {
                Some(tick) => tick,
                None => break,
            },
        };

        trace!(
            watch = %id,
            tick = tick.seq,
            lag = ?tick.fired_at.elapsed(),
            "executing query"
        );
        let snapshot = observe(searcher.as_ref(), &query, query_timeout).await;
        if let Some(err) = snapshot.error() {
            debug!(watch = %id, tick = tick.seq, error = %err, "search failed");
        }

        checker = match run_checker(checker, snapshot).await {
            Some(checker) => checker,
            None => {
                error!(watch = %id, "checker lost; watch worker exiting");
                return;
            }
        };
    }

    info!(watch = %id, "finishing");
}

/// Run `Checker::check` on the blocking pool so a checker may block without
/// stalling the runtime. A panicking checker is logged and kept.
async fn run_checker(
    mut checker: Box<dyn Checker>,
    snapshot: Snapshot,
) -> Option<Box<dyn Checker>> {
    let joined = tokio::task::spawn_blocking(move || {
        let res = panic::catch_unwind(AssertUnwindSafe(|| checker.check(&snapshot)));
        (checker, res)
    })
    .await;

    match joined {
        Ok((checker, Ok(()))) => Some(checker),
        Ok((checker, Err(payload))) => {
            error!(reason = %panic_message(payload.as_ref()), "checker panicked");
            Some(checker)
        }
        Err(err) => {
            error!(error = %err, "checker task failed");
            None
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
