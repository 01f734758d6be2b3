// tests/change_detection.rs

mod common;
use crate::common::fixtures::{fry, person, person_query};
use crate::common::{eventually, init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use ldapwatch::check::{Change, Comparison, DiffChecker};
use ldapwatch::search::SearchError;
use ldapwatch::watch::Watcher;
use ldapwatch_test_utils::ScriptedSearcher;

type TestResult = Result<(), Box<dyn Error>>;

const TICK: Duration = Duration::from_millis(10);
const FRY: &str = "(cn=Philip J. Fry)";

/// Run one diffing watch over `searcher` until it has searched `rounds`
/// times, then stop and return every change that was reported.
async fn changes_after(
    searcher: Arc<ScriptedSearcher>,
    compare: Comparison,
    rounds: usize,
) -> Result<Vec<Change>, Box<dyn Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = Watcher::new(searcher.clone(), TICK)?;
    watcher.add(
        person_query("Philip J. Fry"),
        DiffChecker::with_compare("fry", compare, tx),
    )?;

    watcher.start()?;
    eventually(|| searcher.calls(FRY) >= rounds).await;
    watcher.stop().await?;
    drop(watcher);

    let mut changes = Vec::new();
    while let Some(change) = rx.recv().await {
        changes.push(change);
    }
    Ok(changes)
}

#[tokio::test]
async fn modify_timestamp_bump_signals_exactly_once() -> TestResult {
    with_timeout(async {
        init_tracing();

        let searcher = Arc::new(ScriptedSearcher::new().script(
            FRY,
            [
                Ok(vec![fry("20240101000000Z")]),
                Ok(vec![fry("20240101000000Z")]),
                Ok(vec![fry("20240202000000Z")]),
            ],
        ));

        let changes = changes_after(searcher, Comparison::attributes(["modifyTimestamp"]), 6).await?;

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].watch, "fry");
        assert_eq!(changes[0].previous, vec![fry("20240101000000Z")]);
        assert_eq!(changes[0].current, vec![fry("20240202000000Z")]);
        assert_eq!(changes[0].summary().modified.len(), 1);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn failure_first_then_success_is_a_fresh_baseline() -> TestResult {
    with_timeout(async {
        init_tracing();

        let searcher = Arc::new(ScriptedSearcher::new().script(
            FRY,
            [
                Err(SearchError::Connection("service unreachable".into())),
                Ok(vec![fry("T1")]),
            ],
        ));

        let changes = changes_after(searcher, Comparison::Structural, 5).await?;
        assert!(changes.is_empty(), "unexpected changes: {changes:?}");

        Ok(())
    })
    .await
}

#[tokio::test]
async fn identical_results_never_signal() -> TestResult {
    with_timeout(async {
        init_tracing();

        let searcher = Arc::new(ScriptedSearcher::new().script(FRY, [Ok(vec![fry("T1")])]));
        let changes = changes_after(searcher, Comparison::Structural, 8).await?;
        assert!(changes.is_empty());

        Ok(())
    })
    .await
}

#[tokio::test]
async fn failure_is_not_an_empty_result() -> TestResult {
    with_timeout(async {
        init_tracing();

        let down = || Err(SearchError::Connection("down".into()));
        let searcher = Arc::new(ScriptedSearcher::new().script(
            FRY,
            [Ok(vec![]), down(), Ok(vec![]), down(), Ok(vec![])],
        ));
        let changes = changes_after(searcher, Comparison::Structural, 6).await?;
        assert!(changes.is_empty(), "failures must not look like removals");

        Ok(())
    })
    .await
}

#[tokio::test]
async fn entry_count_change_signals() -> TestResult {
    with_timeout(async {
        init_tracing();

        let copy = person("copy-Philip J. Fry", "T1", "fired@example.org");
        let searcher = Arc::new(ScriptedSearcher::new().script(
            FRY,
            [Ok(vec![fry("T1")]), Ok(vec![fry("T1"), copy.clone()])],
        ));

        let changes = changes_after(searcher, Comparison::attributes(["modifyTimestamp"]), 4).await?;

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].summary().added, vec![copy.dn]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn mail_change_is_seen_structurally_but_not_by_timestamp() -> TestResult {
    with_timeout(async {
        init_tracing();

        let script = || {
            [
                Ok(vec![fry("T1")]),
                Ok(vec![person("Philip J. Fry", "T1", "fired@example.org")]),
            ]
        };

        let structural = changes_after(
            Arc::new(ScriptedSearcher::new().script(FRY, script())),
            Comparison::Structural,
            4,
        )
        .await?;
        assert_eq!(structural.len(), 1);

        let by_timestamp = changes_after(
            Arc::new(ScriptedSearcher::new().script(FRY, script())),
            Comparison::attributes(["modifyTimestamp"]),
            4,
        )
        .await?;
        assert!(by_timestamp.is_empty());

        Ok(())
    })
    .await
}
