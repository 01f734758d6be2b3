// tests/config_loading.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use ldapwatch::check::Comparison;
use ldapwatch::config::load_and_validate;
use ldapwatch::errors::LdapwatchError;
use ldapwatch::search::Scope;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn demo_config_loads() -> TestResult {
    init_tracing();

    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = load_and_validate(manifest.join("demos/ldapwatch.toml"))?;

    assert_eq!(cfg.interval, Duration::from_secs(1));
    assert_eq!(cfg.query_timeout, Some(Duration::from_secs(10)));
    assert_eq!(cfg.shutdown_timeout, Some(Duration::from_secs(5)));
    assert_eq!(cfg.watch.len(), 2);

    let fry = &cfg.watch["fry"];
    assert_eq!(fry.comparison(), Comparison::attributes(["modifyTimestamp"]));
    let q = fry.query();
    assert_eq!(q.scope, Scope::Subtree);
    assert_eq!(q.filter, "(cn=Philip J. Fry)");
    assert_eq!(q.attributes, vec!["*".to_string(), "modifyTimestamp".to_string()]);

    let people = &cfg.watch["people"];
    assert_eq!(people.scope, Scope::One);
    assert_eq!(people.comparison(), Comparison::Structural);

    let opts = cfg.connect_options()?;
    assert_eq!(opts.url, "ldap://localhost:389");
    assert!(opts.bind.is_some());
    Ok(())
}

#[test]
fn missing_watches_is_a_config_error() {
    let file = write_config(
        r#"
[ldap]
url = "ldap://localhost"
"#,
    );

    match load_and_validate(file.path()) {
        Err(LdapwatchError::ConfigError(msg)) => assert!(msg.contains("[watch.<name>]")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn bad_url_scheme_is_rejected() {
    let file = write_config(
        r#"
[ldap]
url = "http://localhost"

[watch.all]
base = "dc=example,dc=com"
"#,
    );

    match load_and_validate(file.path()) {
        Err(LdapwatchError::ConfigError(msg)) => assert!(msg.contains("http://localhost")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn unparenthesised_filter_is_rejected() {
    let file = write_config(
        r#"
[ldap]
url = "ldaps://ldap.example.com"

[watch.fry]
base = "ou=people,dc=example,dc=com"
filter = "cn=Fry"
"#,
    );

    match load_and_validate(file.path()) {
        Err(LdapwatchError::ConfigError(msg)) => {
            assert!(msg.contains("fry"));
            assert!(msg.contains("parentheses"));
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn bad_duration_is_rejected() {
    let file = write_config(
        r#"
[config]
interval = "5 fortnights"

[ldap]
url = "ldap://localhost"

[watch.all]
base = "dc=example,dc=com"
"#,
    );

    match load_and_validate(file.path()) {
        Err(LdapwatchError::ConfigError(msg)) => assert!(msg.contains("interval")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = write_config("[ldap\nurl = ");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(LdapwatchError::TomlError(_))
    ));
}

#[test]
fn unknown_scope_is_a_toml_error() {
    let file = write_config(
        r#"
[ldap]
url = "ldap://localhost"

[watch.all]
base = "dc=example,dc=com"
scope = "everything"
"#,
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(LdapwatchError::TomlError(_))
    ));
}
