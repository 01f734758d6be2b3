// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only setup and lifecycle problems are errors here. Failures of a single
//! search are carried as data inside a [`Snapshot`](crate::search::Snapshot).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LdapwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Watcher already started")]
    AlreadyStarted,

    #[error("Watcher is not running")]
    NotRunning,

    #[error("Shutdown timed out; {pending} watch worker(s) had to be aborted")]
    ShutdownTimedOut { pending: usize },

    #[error("LDAP error: {0}")]
    Ldap(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LdapwatchError>;
