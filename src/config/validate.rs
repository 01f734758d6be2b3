// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{LdapwatchError, Result};
use crate::watch::{DEFAULT_QUERY_TIMEOUT, MAX_DURATION};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = LdapwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_watches(&raw)?;
        validate_ldap(&raw)?;
        validate_watches(&raw)?;

        let interval = parse_setting("interval", &raw.config.interval)?;

        let query_timeout = match raw.config.query_timeout.as_deref() {
            None => Some(DEFAULT_QUERY_TIMEOUT),
            Some(s) if is_off(s) => None,
            Some(s) => Some(parse_setting("query_timeout", s)?),
        };
        let shutdown_timeout = raw
            .config
            .shutdown_timeout
            .as_deref()
            .map(|s| parse_setting("shutdown_timeout", s))
            .transpose()?;
        let connect_timeout = raw
            .config
            .connect_timeout
            .as_deref()
            .map(|s| parse_setting("connect_timeout", s))
            .transpose()?;

        Ok(ConfigFile {
            interval,
            query_timeout,
            shutdown_timeout,
            connect_timeout,
            ldap: raw.ldap,
            watch: raw.watch,
        })
    }
}

fn ensure_has_watches(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.is_empty() {
        return Err(LdapwatchError::ConfigError(
            "config must contain at least one [watch.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_ldap(cfg: &RawConfigFile) -> Result<()> {
    let url = cfg.ldap.url.trim();
    let scheme = url.split_once("://").map(|(scheme, _)| scheme);
    match scheme {
        Some("ldap" | "ldaps" | "ldapi") => Ok(()),
        _ => Err(LdapwatchError::ConfigError(format!(
            "[ldap].url must start with ldap://, ldaps:// or ldapi:// (got '{url}')"
        ))),
    }
}

fn validate_watches(cfg: &RawConfigFile) -> Result<()> {
    for (name, watch) in cfg.watch.iter() {
        if watch.base.trim().is_empty() {
            return Err(LdapwatchError::ConfigError(format!(
                "watch '{name}' has an empty `base`"
            )));
        }

        let filter = watch.filter.trim();
        if !(filter.starts_with('(') && filter.ends_with(')')) {
            return Err(LdapwatchError::ConfigError(format!(
                "watch '{name}' has filter '{filter}' which is not enclosed in parentheses"
            )));
        }

        if watch.compare.iter().any(|a| a.trim().is_empty()) {
            return Err(LdapwatchError::ConfigError(format!(
                "watch '{name}' lists an empty attribute name in `compare`"
            )));
        }
    }
    Ok(())
}

fn is_off(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "off" | "none")
}

fn parse_setting(key: &str, value: &str) -> Result<Duration> {
    let d = parse_duration(value)
        .map_err(|e| LdapwatchError::ConfigError(format!("[config].{key}: {e}")))?;
    if d.is_zero() {
        return Err(LdapwatchError::ConfigError(format!(
            "[config].{key} must be greater than zero"
        )));
    }
    if d > MAX_DURATION {
        return Err(LdapwatchError::ConfigError(format!(
            "[config].{key} must not exceed {MAX_DURATION:?}"
        )));
    }
    Ok(d)
}

/// Parse `"250ms"`, `"10s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
