// src/ldap/mod.rs

//! Production [`Searcher`] backed by the `ldap3` crate.
//!
//! This is a thin adapter: connect, optionally bind, and translate between
//! the crate's [`Query`]/[`Entry`] model and `ldap3`'s types. The watcher
//! core never depends on it.

use std::time::Duration;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, SearchEntry};
use tracing::{debug, info, warn};

use crate::errors::{LdapwatchError, Result};
use crate::search::{Entry, Query, Scope, SearchError, SearchFuture, Searcher};

/// How to reach and authenticate against the directory server.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub url: String,
    /// `(bind_dn, password)` for a simple bind; `None` stays anonymous.
    pub bind: Option<(String, String)>,
    pub connect_timeout: Option<Duration>,
}

/// Shared LDAP connection usable from every watch worker.
///
/// `ldap3` multiplexes operations over one connection, so each search works
/// on a cheap clone of the handle.
#[derive(Clone)]
pub struct LdapSearcher {
    ldap: Ldap,
}

impl std::fmt::Debug for LdapSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSearcher").finish_non_exhaustive()
    }
}

impl LdapSearcher {
    /// Connect to `opts.url` and bind if credentials are given.
    pub async fn connect(opts: &ConnectOptions) -> Result<Self> {
        let mut settings = LdapConnSettings::new();
        if let Some(limit) = opts.connect_timeout {
            settings = settings.set_conn_timeout(limit);
        }

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &opts.url)
            .await
            .map_err(|e| LdapwatchError::Ldap(format!("connecting to {}: {e}", opts.url)))?;

        let url = opts.url.clone();
        tokio::spawn(async move {
            if let Err(err) = conn.drive().await {
                warn!(url = %url, error = %err, "LDAP connection closed with error");
            }
        });

        if let Some((dn, password)) = &opts.bind {
            ldap.simple_bind(dn, password)
                .await
                .and_then(|res| res.success())
                .map_err(|e| LdapwatchError::Ldap(format!("binding as {dn}: {e}")))?;
            debug!(bind_dn = %dn, "bound to directory");
        }

        info!(url = %opts.url, "connected to directory server");
        Ok(Self { ldap })
    }

    /// Politely close the connection.
    pub async fn unbind(mut self) {
        if let Err(err) = self.ldap.unbind().await {
            debug!(error = %err, "unbind failed");
        }
    }
}

impl Searcher for LdapSearcher {
    fn search<'a>(&'a self, query: &'a Query) -> SearchFuture<'a> {
        let mut ldap = self.ldap.clone();

        Box::pin(async move {
            let attrs = query.attributes.clone();
            let (entries, _res) = ldap
                .search(&query.base, ldap_scope(query.scope), &query.filter, attrs)
                .await
                .and_then(|res| res.success())
                .map_err(search_error)?;

            Ok(entries
                .into_iter()
                .map(|raw| {
                    let entry = SearchEntry::construct(raw);
                    Entry {
                        dn: entry.dn,
                        attrs: entry.attrs.into_iter().collect(),
                    }
                })
                .collect())
        })
    }
}

fn ldap_scope(scope: Scope) -> ldap3::Scope {
    match scope {
        Scope::Base => ldap3::Scope::Base,
        Scope::One => ldap3::Scope::OneLevel,
        Scope::Subtree => ldap3::Scope::Subtree,
    }
}

fn search_error(err: LdapError) -> SearchError {
    match err {
        LdapError::LdapResult { result, .. } => SearchError::Protocol {
            code: result.rc,
            message: result.text,
        },
        other => SearchError::Connection(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_map_one_to_one() {
        assert!(matches!(ldap_scope(Scope::Base), ldap3::Scope::Base));
        assert!(matches!(ldap_scope(Scope::One), ldap3::Scope::OneLevel));
        assert!(matches!(ldap_scope(Scope::Subtree), ldap3::Scope::Subtree));
    }
}
