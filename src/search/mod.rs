// src/search/mod.rs

//! Search data model and the `Searcher` capability.
//!
//! The watcher core treats a [`Query`] as an opaque token handed straight to
//! a [`Searcher`]. Every execution produces exactly one [`Snapshot`], which is
//! either a list of entries or a [`SearchError`]. There is no nullable
//! "maybe a result" slot: a failed search is never mistaken for an empty one.

pub mod model;
pub mod searcher;

pub use model::{Entry, Outcome, Query, Scope, SearchError, Snapshot};
pub use searcher::{observe, SearchFuture, Searcher};
