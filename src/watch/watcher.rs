// src/watch/watcher.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use super::fanout::{run_fanout, TickTarget};
use super::worker::{run_worker, Watch, WatchId, WorkerContext};
use super::Tick;
use crate::check::Checker;
use crate::errors::{LdapwatchError, Result};
use crate::search::{Query, Searcher};

/// Poll interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Per-search bound used when none is configured.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest interval or timeout a watcher accepts (one year).
pub const MAX_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Configuration for a [`Watcher`].
#[derive(Clone)]
pub struct WatcherBuilder {
    searcher: Option<Arc<dyn Searcher>>,
    interval: Duration,
    query_timeout: Option<Duration>,
    shutdown_timeout: Option<Duration>,
}

impl Default for WatcherBuilder {
    fn default() -> Self {
        Self {
            searcher: None,
            interval: DEFAULT_INTERVAL,
            query_timeout: Some(DEFAULT_QUERY_TIMEOUT),
            shutdown_timeout: None,
        }
    }
}

impl fmt::Debug for WatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherBuilder")
            .field("searcher", &self.searcher.is_some())
            .field("interval", &self.interval)
            .field("query_timeout", &self.query_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl WatcherBuilder {
    /// Backend every watch searches through. Required.
    pub fn searcher(mut self, searcher: Arc<dyn Searcher>) -> Self {
        self.searcher = Some(searcher);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Upper bound for a single search; `None` waits forever.
    pub fn query_timeout(mut self, limit: Option<Duration>) -> Self {
        self.query_timeout = limit;
        self
    }

    /// Upper bound for [`Watcher::stop`]; `None` waits forever.
    pub fn shutdown_timeout(mut self, limit: Option<Duration>) -> Self {
        self.shutdown_timeout = limit;
        self
    }

    pub fn build(self) -> Result<Watcher> {
        let searcher = self.searcher.ok_or_else(|| {
            LdapwatchError::ConfigError("a searcher is required".to_string())
        })?;

        check_duration("poll interval", self.interval)?;
        if let Some(limit) = self.query_timeout {
            check_duration("query timeout", limit)?;
        }
        if let Some(limit) = self.shutdown_timeout {
            check_duration("shutdown timeout", limit)?;
        }

        Ok(Watcher {
            searcher,
            interval: self.interval,
            query_timeout: self.query_timeout,
            shutdown_timeout: self.shutdown_timeout,
            registered: 0,
            state: State::Idle(Vec::new()),
        })
    }
}

fn check_duration(name: &str, d: Duration) -> Result<()> {
    if d.is_zero() {
        return Err(LdapwatchError::ConfigError(format!(
            "{name} must be greater than zero"
        )));
    }
    if d > MAX_DURATION {
        return Err(LdapwatchError::ConfigError(format!(
            "{name} must not exceed {MAX_DURATION:?}"
        )));
    }
    Ok(())
}

struct WorkerHandle {
    id: WatchId,
    done_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

struct Running {
    stop_fanout: oneshot::Sender<()>,
    fanout: JoinHandle<u64>,
    workers: Vec<WorkerHandle>,
}

enum State {
    /// Accepting registrations.
    Idle(Vec<Watch>),
    Running(Running),
    Stopped,
}

/// Re-runs a set of queries on a shared timer and feeds each result to the
/// watch's checker.
///
/// Lifecycle: build, [`add`](Self::add) every watch, [`start`](Self::start)
/// once, [`stop`](Self::stop) once. A stopped watcher cannot be restarted and
/// watches cannot be added or removed once started.
///
/// Dropping a running watcher signals every task to stop but does not wait
/// for them.
pub struct Watcher {
    searcher: Arc<dyn Searcher>,
    interval: Duration,
    query_timeout: Option<Duration>,
    shutdown_timeout: Option<Duration>,
    registered: usize,
    state: State,
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Idle(_) => "idle",
            State::Running(_) => "running",
            State::Stopped => "stopped",
        };
        f.debug_struct("Watcher")
            .field("interval", &self.interval)
            .field("query_timeout", &self.query_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("watches", &self.registered)
            .field("state", &state)
            .finish()
    }
}

impl Watcher {
    pub fn builder() -> WatcherBuilder {
        WatcherBuilder::default()
    }

    /// Watcher with the given searcher and interval, default timeouts.
    pub fn new(searcher: Arc<dyn Searcher>, interval: Duration) -> Result<Self> {
        Self::builder().searcher(searcher).interval(interval).build()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of registered watches.
    pub fn len(&self) -> usize {
        self.registered
    }

    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// Register `query` with `checker`. Identical queries are independent
    /// watches.
    ///
    /// Only allowed before [`start`](Self::start); afterwards this returns
    /// [`LdapwatchError::AlreadyStarted`].
    pub fn add<C>(&mut self, query: Query, checker: C) -> Result<WatchId>
    where
        C: Checker + 'static,
    {
        let State::Idle(watches) = &mut self.state else {
            return Err(LdapwatchError::AlreadyStarted);
        };

        let id = WatchId(self.registered);
        debug!(watch = %id, query = %query, "watch registered");
        watches.push(Watch::new(id, query, Box::new(checker)));
        self.registered += 1;
        Ok(id)
    }

    /// Spawn one worker per watch plus the timer fan-out task.
    ///
    /// Must be called from within a Tokio runtime. The first tick fires one
    /// interval after this returns.
    pub fn start(&mut self) -> Result<()> {
        let handle = Handle::try_current().map_err(|_| {
            LdapwatchError::ConfigError("watcher must be started inside a Tokio runtime".to_string())
        })?;

        let watches = match std::mem::replace(&mut self.state, State::Stopped) {
            State::Idle(watches) => watches,
            other => {
                self.state = other;
                return Err(LdapwatchError::AlreadyStarted);
            }
        };

        let mut targets: Vec<TickTarget> = Vec::with_capacity(watches.len());
        let mut workers = Vec::with_capacity(watches.len());

        for watch in watches {
            let id = watch.id();
            let (tick_tx, tick_rx) = mpsc::channel::<Tick>(1);
            let (done_tx, done_rx) = oneshot::channel::<()>();

            let ctx = WorkerContext {
                searcher: Arc::clone(&self.searcher),
                query_timeout: self.query_timeout,
                tick_rx,
                done_rx,
            };
            let join = handle.spawn(run_worker(watch, ctx));

            targets.push((id, tick_tx));
            workers.push(WorkerHandle { id, done_tx, join });
        }

        let (stop_fanout, stop_rx) = oneshot::channel::<()>();
        let fanout = handle.spawn(run_fanout(self.interval, targets, stop_rx));

        info!(
            watches = workers.len(),
            interval = ?self.interval,
            "watcher started"
        );

        self.state = State::Running(Running {
            stop_fanout,
            fanout,
            workers,
        });
        Ok(())
    }

    /// Stop ticking, signal every worker and wait until all of them exited.
    ///
    /// A worker in the middle of a search or checker call finishes that call
    /// first. Once this returns no checker is invoked again.
    ///
    /// With a shutdown timeout, workers still running at the deadline are
    /// aborted (and awaited) and [`LdapwatchError::ShutdownTimedOut`] is
    /// returned.
    pub async fn stop(&mut self) -> Result<()> {
        let running = match std::mem::replace(&mut self.state, State::Stopped) {
            State::Running(running) => running,
            other => {
                self.state = other;
                return Err(LdapwatchError::NotRunning);
            }
        };

        let Running {
            stop_fanout,
            fanout,
            workers,
        } = running;

        let _ = stop_fanout.send(());
        match fanout.await {
            Ok(ticks) => debug!(ticks, "timer stopped"),
            Err(err) => warn!(error = %err, "fan-out task failed"),
        }

        info!(watches = workers.len(), "stopping watch workers");
        let joins: Vec<(WatchId, JoinHandle<()>)> = workers
            .into_iter()
            .map(|w| {
                let _ = w.done_tx.send(());
                (w.id, w.join)
            })
            .collect();

        // `build` caps the limit, so the addition only fails on a broken clock.
        let deadline = self
            .shutdown_timeout
            .and_then(|limit| Instant::now().checked_add(limit));
        let mut aborted = 0usize;

        for (id, mut join) in joins {
            let res = match deadline {
                Some(deadline) => {
                    let waited = timeout_at(deadline, &mut join).await;
                    match waited {
                        Ok(res) => res,
                        Err(_) => {
                            warn!(watch = %id, "watch worker did not stop in time; aborting");
                            join.abort();
                            aborted += 1;
                            join.await
                        }
                    }
                }
                None => join.await,
            };

            if let Err(err) = res {
                if !err.is_cancelled() {
                    error!(watch = %id, error = %err, "watch worker failed");
                }
            }
        }

        info!("watcher stopped");

        if aborted > 0 {
            return Err(LdapwatchError::ShutdownTimedOut { pending: aborted });
        }
        Ok(())
    }
}
