// src/lib.rs

//! Polling change detection for LDAP searches.
//!
//! LDAP has no portable "tell me when this changes" operation, so ldapwatch
//! re-runs a set of searches on a timer and hands every result to a
//! caller-supplied [`Checker`](check::Checker) that decides whether anything
//! changed.
//!
//! ```no_run
//! # async fn demo(searcher: std::sync::Arc<dyn ldapwatch::search::Searcher>) -> ldapwatch::errors::Result<()> {
//! use std::time::Duration;
//! use ldapwatch::check::DiffChecker;
//! use ldapwatch::search::Query;
//! use ldapwatch::watch::Watcher;
//!
//! let (tx, mut changes) = tokio::sync::mpsc::unbounded_channel();
//! let mut watcher = Watcher::new(searcher, Duration::from_secs(1))?;
//! watcher.add(
//!     Query::new("ou=people,dc=planetexpress,dc=com").filter("(cn=Philip J. Fry)"),
//!     DiffChecker::new("fry", tx),
//! )?;
//! watcher.start()?;
//! if let Some(change) = changes.recv().await {
//!     println!("{:?}", change.summary());
//! }
//! watcher.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod cli;
pub mod config;
pub mod errors;
pub mod ldap;
pub mod logging;
pub mod search;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::check::{Change, DiffChecker};
use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate, ConfigFile};
use crate::ldap::LdapSearcher;
use crate::search::{observe, Outcome, Searcher};
use crate::watch::Watcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the LDAP connection
/// - one diffing watch per `[watch.<name>]`
/// - change reporting
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config from {:?}", config_path))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let searcher = LdapSearcher::connect(&cfg.connect_options()?).await?;

    if args.once {
        run_once(&cfg, &searcher).await;
        searcher.unbind().await;
        return Ok(());
    }

    let (change_tx, change_rx) = mpsc::unbounded_channel::<Change>();
    let reporter = tokio::spawn(report_changes(change_rx));

    let mut watcher = Watcher::builder()
        .searcher(Arc::new(searcher.clone()))
        .interval(cfg.interval)
        .query_timeout(cfg.query_timeout)
        .shutdown_timeout(cfg.shutdown_timeout)
        .build()?;

    for (name, watch) in cfg.watch.iter() {
        let checker = DiffChecker::with_compare(name.clone(), watch.comparison(), change_tx.clone());
        let id = watcher.add(watch.query(), checker)?;
        info!(watch = %name, id = %id, query = %watch.query(), "watching");
    }
    // Only the checkers hold senders now; the reporter ends once they're gone.
    drop(change_tx);

    watcher.start()?;

    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl+C")?;
    info!("interrupted");

    let stopped = watcher.stop().await;
    drop(watcher);
    if let Err(err) = reporter.await {
        warn!(error = %err, "change reporter failed");
    }
    searcher.unbind().await;

    stopped.map_err(Into::into)
}

/// Log every change the checkers report until all of them are gone.
async fn report_changes(mut rx: mpsc::UnboundedReceiver<Change>) {
    while let Some(change) = rx.recv().await {
        let summary = change.summary();
        info!(
            watch = %change.watch,
            added = ?summary.added,
            removed = ?summary.removed,
            modified = ?summary.modified,
            "change detected"
        );
    }
}

/// Execute every watch's search once and print what came back.
async fn run_once(cfg: &ConfigFile, searcher: &dyn Searcher) {
    for (name, watch) in cfg.watch.iter() {
        let snapshot = observe(searcher, &watch.query(), cfg.query_timeout).await;
        match snapshot.outcome() {
            Outcome::Entries(entries) => {
                println!("{name}: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
                for entry in entries {
                    println!("  {}", entry.dn);
                }
            }
            Outcome::Failed(err) => println!("{name}: search failed: {err}"),
        }
    }
}

/// Simple dry-run output: print settings and watches.
fn print_dry_run(cfg: &ConfigFile) {
    println!("ldapwatch dry-run");
    println!("  ldap.url = {}", cfg.ldap.url);
    if let Some(ref dn) = cfg.ldap.bind_dn {
        println!("  ldap.bind_dn = {dn}");
    }
    println!("  config.interval = {:?}", cfg.interval);
    println!("  config.query_timeout = {:?}", cfg.query_timeout);
    println!("  config.shutdown_timeout = {:?}", cfg.shutdown_timeout);
    println!();

    println!("watches ({}):", cfg.watch.len());
    for (name, watch) in cfg.watch.iter() {
        println!("  - {name}");
        println!("      base: {}", watch.base);
        println!("      scope: {}", watch.scope);
        println!("      filter: {}", watch.filter);
        if !watch.attributes.is_empty() {
            println!("      attributes: {:?}", watch.attributes);
        }
        if !watch.compare.is_empty() {
            println!("      compare: {:?}", watch.compare);
        }
    }
}
