//! Configuration commands

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::{ConfigError, Result};

/// Write a config file populated with the built-in defaults
pub fn init(config_path: Option<&str>, force: bool) -> Result<()> {
    let path = Config::resolve_path(config_path)?;
    if path.exists() && !force {
        return Err(ConfigError::Invalid(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ))
        .into());
    }

    let written = Config::default().save_at(config_path)?;
    println!("{} Wrote default config to {}", "✓".green(), written.display());
    Ok(())
}

/// Print the effective configuration
pub fn show(config_path: Option<&str>, format: OutputFormat) -> Result<()> {
    let config = Config::load_at(config_path)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        _ => {
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| ConfigError::SaveError(e.to_string()))?;
            print!("{}", yaml);
        }
    }
    Ok(())
}
