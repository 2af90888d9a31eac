//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod args;
pub mod cache;
pub mod config;
pub mod context;
pub mod feed;
pub mod resolve;

pub use args::{CacheKind, OutputFormat};

/// civicgrid - recent 311 street-condition reports with photo evidence
#[derive(Parser, Debug)]
#[command(name = "civicgrid")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "CIVICGRID_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "CIVICGRID_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "CIVICGRID_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass cache, fetch fresh data
    #[arg(long, global = true, env = "CIVICGRID_NO_CACHE", hide_env = true)]
    pub no_cache: bool,

    /// Override the open-data feed endpoint
    #[arg(long, global = true, env = "CIVICGRID_FEED_URL", hide_env = true)]
    pub feed_url: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List recent reports with their photos
    #[command(after_help = "\
Examples:
  civicgrid feed
  civicgrid feed --pages 2 --format table
  civicgrid feed --save-dir ./photos
  civicgrid feed --no-resolve --format json")]
    Feed {
        /// Pages to load (each extra page adds 300 records)
        #[arg(long, short = 'p', default_value_t = 1)]
        pages: usize,

        /// Write decoded portal images into this directory
        #[arg(long, value_name = "DIR")]
        save_dir: Option<PathBuf>,

        /// Show portal links instead of unwrapping them
        #[arg(long)]
        no_resolve: bool,
    },

    /// Resolve one media reference (URL or JSON object) to an image
    Resolve {
        /// Media URL, or a JSON object like '{"url": "..."}'
        media: String,

        /// Write decoded bytes to this file
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Classify a media reference without fetching anything
    Classify {
        /// Media URL, or a JSON object like '{"url": "..."}'
        media: String,
    },

    /// Manage local response cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    #[command(after_help = "\
Examples:
  bash:   civicgrid completion bash > /etc/bash_completion.d/civicgrid
  zsh:    civicgrid completion zsh > \"${fpath[1]}/_civicgrid\"
  fish:   civicgrid completion fish > ~/.config/fish/completions/civicgrid.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Display version information
    Version,
}

/// Cache management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache statistics
    Status,
    /// Clear cached data
    Clear {
        /// Only clear one kind of entry
        #[arg(long, value_enum)]
        kind: Option<CacheKind>,
    },
    /// Print cache directory path
    Path,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_feed_defaults() {
        let cli = Cli::parse_from(["civicgrid", "feed"]);
        match cli.command {
            Commands::Feed {
                pages,
                save_dir,
                no_resolve,
            } => {
                assert_eq!(pages, 1);
                assert!(save_dir.is_none());
                assert!(!no_resolve);
            }
            other => panic!("Expected feed, got {:?}", other),
        }
    }

    #[test]
    fn test_cache_clear_kind() {
        let cli = Cli::parse_from(["civicgrid", "cache", "clear", "--kind", "portal"]);
        assert!(matches!(
            cli.command,
            Commands::Cache(CacheCommands::Clear {
                kind: Some(CacheKind::Portal)
            })
        ));
    }
}
