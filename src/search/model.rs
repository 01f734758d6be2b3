// src/search/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use serde::Deserialize;
use thiserror::Error;

/// Filter used when a query doesn't name one.
pub const DEFAULT_FILTER: &str = "(objectClass=*)";

/// How far below `base` a search reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Only the base entry itself.
    Base,
    /// Immediate children of the base entry.
    #[serde(alias = "onelevel")]
    One,
    /// The base entry and everything below it.
    #[default]
    Subtree,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Base => "base",
            Scope::One => "one",
            Scope::Subtree => "subtree",
        };
        f.write_str(s)
    }
}

/// A caller-built search request.
///
/// Immutable once handed to [`Watcher::add`](crate::watch::Watcher::add).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub base: String,
    pub scope: Scope,
    pub filter: String,
    /// Requested attributes. Empty means "whatever the server returns by default".
    pub attributes: Vec<String>,
}

impl Query {
    /// Subtree search under `base` matching every object.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            scope: Scope::default(),
            filter: DEFAULT_FILTER.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn attributes<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attrs.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.base, self.scope, self.filter)
    }
}

/// One directory entry returned by a search.
///
/// Ordered by DN first, then by attributes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Entry {
    pub dn: String,
    pub attrs: BTreeMap<String, Vec<String>>,
}

impl Entry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Builder-style helper, mostly useful in tests and fake searchers.
    pub fn with_attr<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// All values of an attribute. Attribute names match case-insensitively.
    pub fn values(&self, name: &str) -> &[String] {
        if let Some(values) = self.attrs.get(name) {
            return values;
        }
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// First value of an attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }
}

/// Why a single search did not produce entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("server returned result code {code}: {message}")]
    Protocol { code: u32, message: String },

    #[error("{0}")]
    Other(String),
}

/// Result part of a [`Snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The search succeeded. Zero entries is a valid, distinct state.
    Entries(Vec<Entry>),
    /// The search failed; there is no result to compare.
    Failed(SearchError),
}

/// Outcome of executing one query at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    taken_at: SystemTime,
    outcome: Outcome,
}

impl Snapshot {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            taken_at: SystemTime::now(),
            outcome,
        }
    }

    pub fn success(entries: Vec<Entry>) -> Self {
        Self::new(Outcome::Entries(entries))
    }

    pub fn failure(error: SearchError) -> Self {
        Self::new(Outcome::Failed(error))
    }

    pub fn taken_at(&self) -> SystemTime {
        self.taken_at
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Entries(_))
    }

    /// Entries of a successful search; `None` for a failure.
    pub fn entries(&self) -> Option<&[Entry]> {
        match &self.outcome {
            Outcome::Entries(entries) => Some(entries),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SearchError> {
        match &self.outcome {
            Outcome::Entries(_) => None,
            Outcome::Failed(err) => Some(err),
        }
    }
}

impl From<Result<Vec<Entry>, SearchError>> for Snapshot {
    fn from(res: Result<Vec<Entry>, SearchError>) -> Self {
        match res {
            Ok(entries) => Snapshot::success(entries),
            Err(err) => Snapshot::failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup_ignores_case() {
        let entry = Entry::new("cn=fry,ou=people")
            .with_attr("modifyTimestamp", ["20240101000000Z"]);

        assert_eq!(entry.attr("modifytimestamp"), Some("20240101000000Z"));
        assert_eq!(entry.attr("modifyTimestamp"), Some("20240101000000Z"));
        assert!(entry.values("mail").is_empty());
    }

    #[test]
    fn empty_success_is_not_a_failure() {
        let empty = Snapshot::success(Vec::new());
        assert!(empty.is_success());
        assert_eq!(empty.entries().map(<[Entry]>::len), Some(0));

        let failed = Snapshot::failure(SearchError::Connection("refused".into()));
        assert!(!failed.is_success());
        assert!(failed.entries().is_none());
        assert!(failed.error().is_some());
    }

    #[test]
    fn query_defaults_to_subtree_match_all() {
        let q = Query::new("dc=example,dc=com");
        assert_eq!(q.scope, Scope::Subtree);
        assert_eq!(q.filter, DEFAULT_FILTER);
        assert_eq!(q.to_string(), "dc=example,dc=com (subtree) (objectClass=*)");
    }
}
