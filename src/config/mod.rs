//! Configuration management for civicgrid

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::portal::SelectionPolicy;

/// Default SODA endpoint for San Francisco 311 cases
pub const DEFAULT_FEED_ENDPOINT: &str = "https://data.sfgov.org/resource/vw6y-z8j6.json";

/// Host fragment shared by every Verint citizen portal deployment
pub const DEFAULT_PORTAL_DOMAIN: &str = "verintcloudservices.com";

/// Origin of the mobile reporting app that links into the portal
pub const DEFAULT_PORTAL_REFERER: &str = "https://mobile311.sfgov.org/";

/// Desktop browser identity; the portal rejects obvious bots
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream feed query settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Attachment portal settings
    #[serde(default)]
    pub portal: PortalConfig,
}

/// Upstream feed query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// SODA resource endpoint
    pub endpoint: String,

    /// Value matched against `analysis_neighborhood`
    pub neighborhood: String,

    /// Substrings matched against `service_name` (LIKE '%..%')
    pub categories: Vec<String>,

    /// Exact `service_subtype` values, OR'ed with the categories
    pub subtypes: Vec<String>,

    /// Rolling window, in days, for `requested_datetime`
    pub window_days: u32,

    /// Records per "load more" page
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_FEED_ENDPOINT.to_string(),
            neighborhood: "South of Market".to_string(),
            categories: vec!["General Request".to_string(), "Encampment".to_string()],
            subtypes: Vec::new(),
            window_days: 90,
            page_size: 300,
        }
    }
}

/// Attachment portal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Substring identifying portal hosts
    pub domain: String,

    /// Referer sent when loading a wrapper page
    pub referer: String,

    /// User-Agent sent on every portal request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Which attachment to treat as the primary photo
    pub selection_policy: SelectionPolicy,

    /// Maximum portal resolutions in flight at once
    pub max_concurrent: usize,

    /// Upper bound on portal requests per second across all sessions
    pub requests_per_second: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_PORTAL_DOMAIN.to_string(),
            referer: DEFAULT_PORTAL_REFERER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 5,
            selection_policy: SelectionPolicy::default(),
            max_concurrent: 4,
            requests_per_second: 6,
        }
    }
}

impl PortalConfig {
    /// Per-request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".civicgrid").join("config.yaml"))
    }

    /// Resolve the config path from an optional override
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from an optional override path.
    ///
    /// A missing file at the default location yields the built-in defaults;
    /// a missing file at an explicit path is an error.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(Path::new(p)),
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load_from(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to an optional override path
    pub fn save_at(&self, path: Option<&str>) -> Result<PathBuf> {
        let path = Self::resolve_path(path)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Set file permissions to 600 on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Reject settings that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.feed.neighborhood.trim().is_empty() {
            return Err(ConfigError::Invalid("feed.neighborhood must not be empty".into()).into());
        }
        if self.feed.page_size == 0 {
            return Err(ConfigError::Invalid("feed.page_size must be at least 1".into()).into());
        }
        if self.portal.max_concurrent == 0 {
            return Err(
                ConfigError::Invalid("portal.max_concurrent must be at least 1".into()).into(),
            );
        }
        if self.portal.timeout_secs == 0 {
            return Err(
                ConfigError::Invalid("portal.timeout_secs must be at least 1".into()).into(),
            );
        }
        if self.portal.requests_per_second == 0 {
            return Err(ConfigError::Invalid(
                "portal.requests_per_second must be at least 1".into(),
            )
            .into());
        }
        Ok(())
    }
}
