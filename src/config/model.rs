// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::check::Comparison;
use crate::errors::{LdapwatchError, Result};
use crate::ldap::ConnectOptions;
use crate::search::model::DEFAULT_FILTER;
use crate::search::{Query, Scope};

/// Environment variable consulted when `[ldap].bind_password` is not set.
pub const BIND_PASSWORD_ENV: &str = "LDAPWATCH_BIND_PASSWORD";

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// interval = "1s"
/// query_timeout = "10s"
///
/// [ldap]
/// url = "ldap://localhost:389"
/// bind_dn = "cn=admin,dc=planetexpress,dc=com"
///
/// [watch.fry]
/// base = "ou=people,dc=planetexpress,dc=com"
/// filter = "(cn=Philip J. Fry)"
/// attributes = ["*", "modifyTimestamp"]
/// compare = ["modifyTimestamp"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    pub ldap: LdapSection,

    /// All watches from `[watch.<name>]`, keyed by name.
    #[serde(default)]
    pub watch: BTreeMap<String, WatchConfig>,
}

/// `[config]` section. Durations are strings like `"500ms"`, `"10s"`, `"1m"`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Bound for one search; `"off"` disables it. Defaults to 30s.
    #[serde(default)]
    pub query_timeout: Option<String>,

    /// Bound for shutdown; unbounded when absent.
    #[serde(default)]
    pub shutdown_timeout: Option<String>,

    #[serde(default)]
    pub connect_timeout: Option<String>,
}

fn default_interval() -> String {
    "500ms".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            query_timeout: None,
            shutdown_timeout: None,
            connect_timeout: None,
        }
    }
}

/// `[ldap]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LdapSection {
    pub url: String,

    #[serde(default)]
    pub bind_dn: Option<String>,

    #[serde(default)]
    pub bind_password: Option<String>,
}

/// `[watch.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    pub base: String,

    #[serde(default)]
    pub scope: Scope,

    #[serde(default = "default_filter")]
    pub filter: String,

    #[serde(default)]
    pub attributes: Vec<String>,

    /// Attributes whose values decide whether an entry changed. Empty means
    /// full structural comparison.
    #[serde(default)]
    pub compare: Vec<String>,
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

impl WatchConfig {
    pub fn query(&self) -> Query {
        Query::new(self.base.clone())
            .scope(self.scope)
            .filter(self.filter.clone())
            .attributes(self.attributes.iter().cloned())
    }

    pub fn comparison(&self) -> Comparison {
        if self.compare.is_empty() {
            Comparison::Structural
        } else {
            Comparison::Attributes(self.compare.clone())
        }
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub interval: Duration,
    pub query_timeout: Option<Duration>,
    pub shutdown_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub ldap: LdapSection,
    pub watch: BTreeMap<String, WatchConfig>,
}

impl ConfigFile {
    /// Connection settings, taking the bind password from
    /// [`BIND_PASSWORD_ENV`] when the file doesn't carry one.
    pub fn connect_options(&self) -> Result<ConnectOptions> {
        self.connect_options_with(std::env::var(BIND_PASSWORD_ENV).ok())
    }

    pub(crate) fn connect_options_with(&self, env_password: Option<String>) -> Result<ConnectOptions> {
        let bind = match &self.ldap.bind_dn {
            None => None,
            Some(dn) => {
                let password = self
                    .ldap
                    .bind_password
                    .clone()
                    .or(env_password)
                    .ok_or_else(|| {
                        LdapwatchError::ConfigError(format!(
                            "[ldap].bind_dn is set but no bind_password (or {BIND_PASSWORD_ENV}) was given"
                        ))
                    })?;
                Some((dn.clone(), password))
            }
        };

        Ok(ConnectOptions {
            url: self.ldap.url.clone(),
            bind,
            connect_timeout: self.connect_timeout,
        })
    }
}
