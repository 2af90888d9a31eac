//! Global CLI options shared across all commands
//!
//! Consolidates the global flags into one struct so handler signatures
//! stay small.

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// CLI flag > environment variable > config file > default. This struct
/// captures the CLI/env layer; config file values are merged in
/// `CommandContext`.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Output format (pretty, table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.civicgrid/config.yaml)
    pub config: Option<String>,

    /// Bypass the local cache
    pub no_cache: bool,

    /// Feed endpoint override
    pub feed_url: Option<String>,
}

impl GlobalOptions {
    /// Called once in main.rs after parsing.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            no_cache: cli.no_cache,
            feed_url: cli.feed_url.clone(),
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Get feed endpoint override as `Option<&str>`.
    pub fn feed_url_ref(&self) -> Option<&str> {
        self.feed_url.as_deref()
    }
}
