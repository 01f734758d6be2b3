// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `ldapwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ldapwatch",
    version,
    about = "Poll LDAP searches and report when their results change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). Defaults to `ldapwatch.toml` in the
    /// current directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run every configured search once, print entry counts and exit.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LDAPWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the watches, but don't connect.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
