// src/watch/fanout.rs

//! Timer fan-out: one interval timer, one tick per watch per expiry.

use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use super::{Tick, WatchId};

/// Tick sender for one watch.
pub(crate) type TickTarget = (WatchId, mpsc::Sender<Tick>);

/// Fire every `period` (first expiry one full period after start) and offer a
/// tick to each target in registration order, until `stop_rx` fires or its
/// sender is dropped.
///
/// Delivery never blocks: a watch that still has an undelivered tick is
/// skipped for this expiry. Returns the number of expiries seen.
pub(crate) async fn run_fanout(
    period: Duration,
    targets: Vec<TickTarget>,
    mut stop_rx: oneshot::Receiver<()>,
) -> u64 {
    // Periods are capped at build time; `now` only stands in on a broken clock.
    let first = Instant::now()
        .checked_add(period)
        .unwrap_or_else(Instant::now);
    let mut timer = interval_at(first, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut seq = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            fired = timer.tick() => {
                seq += 1;
                debug!(tick = seq, watches = targets.len(), "tick");
                broadcast(
                    &targets,
                    Tick {
                        seq,
                        fired_at: fired.into_std(),
                    },
                );
            }
        }
    }

    debug!(ticks = seq, "fan-out finished");
    seq
}

fn broadcast(targets: &[TickTarget], tick: Tick) {
    for (id, tx) in targets {
        match tx.try_send(tick) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!(watch = %id, tick = tick.seq, "watch still busy; tick skipped");
            }
            Err(TrySendError::Closed(_)) => {
                trace!(watch = %id, tick = tick.seq, "watch worker gone; tick dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn busy_watch_holds_at_most_one_tick() {
        let (tx, mut rx) = mpsc::channel(1);
        let targets = vec![(WatchId(0), tx)];

        for seq in 1..=3 {
            broadcast(
                &targets,
                Tick {
                    seq,
                    fired_at: std::time::Instant::now(),
                },
            );
        }

        assert_eq!(rx.recv().await.map(|t| t.seq), Some(1));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropping_stop_sender_ends_fanout() {
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_fanout(Duration::from_secs(3600), Vec::new(), stop_rx));
        drop(stop_tx);

        let ticks = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("fan-out did not stop")
            .expect("fan-out panicked");
        assert_eq!(ticks, 0);
    }
}
