// src/check/diff.rs

use std::collections::BTreeMap;
use std::time::SystemTime;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::compare::{Compare, Comparison};
use super::Checker;
use crate::search::{Entry, Outcome, Snapshot};

/// A detected difference between two successful snapshots of one watch.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Label of the watch that produced the change.
    pub watch: String,
    pub previous: Vec<Entry>,
    pub current: Vec<Entry>,
    pub detected_at: SystemTime,
}

/// DNs that appeared, disappeared or changed between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl Change {
    pub fn summary(&self) -> ChangeSummary {
        let prev: BTreeMap<&str, &Entry> =
            self.previous.iter().map(|e| (e.dn.as_str(), e)).collect();
        let next: BTreeMap<&str, &Entry> =
            self.current.iter().map(|e| (e.dn.as_str(), e)).collect();

        let mut summary = ChangeSummary::default();
        for (dn, entry) in &next {
            match prev.get(dn) {
                None => summary.added.push(dn.to_string()),
                Some(old) if old != entry => summary.modified.push(dn.to_string()),
                Some(_) => {}
            }
        }
        summary.removed = prev
            .keys()
            .filter(|dn| !next.contains_key(*dn))
            .map(|dn| dn.to_string())
            .collect();
        summary
    }
}

/// Baseline-keeping checker that reports changes on a channel.
///
/// - The first successful snapshot only records a baseline.
/// - A failed snapshot is logged and otherwise ignored; the previous
///   baseline (if any) stays in place.
/// - Every later successful snapshot is compared with the baseline and
///   becomes the new baseline. When the comparison reports a difference a
///   [`Change`] is sent.
pub struct DiffChecker<C = Comparison> {
    label: String,
    compare: C,
    previous: Option<Vec<Entry>>,
    tx: mpsc::UnboundedSender<Change>,
}

impl DiffChecker<Comparison> {
    /// Checker using [`Comparison::Structural`].
    pub fn new(label: impl Into<String>, tx: mpsc::UnboundedSender<Change>) -> Self {
        Self::with_compare(label, Comparison::Structural, tx)
    }
}

impl<C: Compare> DiffChecker<C> {
    pub fn with_compare(
        label: impl Into<String>,
        compare: C,
        tx: mpsc::UnboundedSender<Change>,
    ) -> Self {
        Self {
            label: label.into(),
            compare,
            previous: None,
            tx,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether a baseline has been recorded yet.
    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }
}

impl<C: Compare> Checker for DiffChecker<C> {
    fn check(&mut self, snapshot: &Snapshot) {
        let current = match snapshot.outcome() {
            Outcome::Entries(entries) => entries,
            Outcome::Failed(err) => {
                debug!(watch = %self.label, error = %err, "search failed; baseline unchanged");
                return;
            }
        };

        let Some(previous) = self.previous.take() else {
            debug!(watch = %self.label, entries = current.len(), "baseline recorded");
            self.previous = Some(current.clone());
            return;
        };

        self.previous = Some(current.clone());

        if !self.compare.changed(&previous, current) {
            return;
        }

        info!(
            watch = %self.label,
            before = previous.len(),
            after = current.len(),
            "result set changed"
        );

        let change = Change {
            watch: self.label.clone(),
            previous,
            current: current.clone(),
            detected_at: snapshot.taken_at(),
        };
        if self.tx.send(change).is_err() {
            debug!(watch = %self.label, "change receiver dropped; notification discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchError;

    fn fry(ts: &str) -> Entry {
        Entry::new("cn=Philip J. Fry,ou=people,dc=planetexpress,dc=com")
            .with_attr("modifyTimestamp", [ts])
    }

    #[test]
    fn first_snapshot_is_baseline_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut checker = DiffChecker::new("fry", tx);

        checker.check(&Snapshot::success(vec![fry("T1")]));

        assert!(checker.has_baseline());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn failure_keeps_previous_baseline() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut checker = DiffChecker::new("fry", tx);

        checker.check(&Snapshot::success(vec![fry("T1")]));
        checker.check(&Snapshot::failure(SearchError::Connection("down".into())));
        checker.check(&Snapshot::success(vec![fry("T1")]));
        assert!(rx.try_recv().is_err());

        checker.check(&Snapshot::failure(SearchError::Connection("down".into())));
        checker.check(&Snapshot::success(vec![fry("T2")]));
        let change = rx.try_recv().expect("change after failure gap");
        assert_eq!(change.previous, vec![fry("T1")]);
        assert_eq!(change.current, vec![fry("T2")]);
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut checker = DiffChecker::new("fry", tx);
        checker.check(&Snapshot::success(vec![]));
        checker.check(&Snapshot::success(vec![fry("T1")]));
    }

    #[test]
    fn summary_splits_added_removed_modified() {
        let change = Change {
            watch: "people".into(),
            previous: vec![Entry::new("cn=a"), fry("T1")],
            current: vec![fry("T2"), Entry::new("cn=b")],
            detected_at: SystemTime::now(),
        };

        let summary = change.summary();
        assert_eq!(summary.added, vec!["cn=b".to_string()]);
        assert_eq!(summary.removed, vec!["cn=a".to_string()]);
        assert_eq!(
            summary.modified,
            vec!["cn=Philip J. Fry,ou=people,dc=planetexpress,dc=com".to_string()]
        );
    }
}
