// src/search/searcher.rs

//! Pluggable search backend.
//!
//! The watcher talks to a `Searcher` instead of a concrete LDAP connection.
//! Production code uses [`LdapSearcher`](crate::ldap::LdapSearcher); tests
//! provide scripted implementations.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::trace;

use super::model::{Entry, Query, SearchError, Snapshot};

pub type SearchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Entry>, SearchError>> + Send + 'a>>;

/// Executes one query and returns its entries or an error.
///
/// A single searcher is shared by every watch of a watcher and may be called
/// concurrently from several workers, so implementations must be safe for
/// concurrent use.
pub trait Searcher: Send + Sync {
    fn search<'a>(&'a self, query: &'a Query) -> SearchFuture<'a>;
}

/// Run `query` once and fold the outcome into a [`Snapshot`].
///
/// With a `timeout`, a search that doesn't finish in time is abandoned and
/// reported as [`SearchError::Timeout`].
pub async fn observe(
    searcher: &dyn Searcher,
    query: &Query,
    timeout: Option<Duration>,
) -> Snapshot {
    let res = match timeout {
        Some(limit) => match tokio::time::timeout(limit, searcher.search(query)).await {
            Ok(res) => res,
            Err(_) => Err(SearchError::Timeout(limit)),
        },
        None => searcher.search(query).await,
    };

    if let Ok(entries) = &res {
        trace!(query = %query, entries = entries.len(), "search finished");
    }

    Snapshot::from(res)
}
