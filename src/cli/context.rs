//! Command execution context
//!
//! Loads configuration once, applies global overrides and builds the feed
//! and portal clients with their caching layers.

use crate::cache::{CachedFeedClient, CachedPortalClient};
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::FeedClient;
use crate::config::Config;
use crate::error::Result;
use crate::media::{ImageFetcher, MediaClassifier};
use crate::portal::PortalClient;

/// Feed client as used by commands
pub type Feed = CachedFeedClient<FeedClient>;

/// Image fetcher as used by commands
pub type Fetcher = ImageFetcher<CachedPortalClient<PortalClient>>;

/// Context for command execution containing config and runtime options.
pub struct CommandContext {
    /// Loaded configuration with overrides applied
    pub config: Config,
    /// Output format preference
    pub format: OutputFormat,
    /// Whether the local cache is in use
    pub cache_enabled: bool,
}

impl CommandContext {
    /// Load config from `opts.config` (or the default location) and apply
    /// the `--feed-url` override.
    ///
    /// # Errors
    /// Returns error if an explicit config file is missing or the effective
    /// config is invalid.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = Config::load_at(opts.config_ref())?;

        if let Some(url) = opts.feed_url_ref() {
            config.feed.endpoint = url.to_string();
        }
        config.validate()?;

        Ok(Self {
            config,
            format: opts.format,
            cache_enabled: !opts.no_cache,
        })
    }

    /// Feed client wrapped with the 5 minute cache
    pub fn feed_client(&self) -> Result<Feed> {
        let endpoint = self.config.feed.endpoint.clone();
        let raw = FeedClient::new(endpoint.clone())?;
        Ok(CachedFeedClient::new(raw, endpoint, self.cache_enabled))
    }

    /// Image fetcher whose portal path goes through the 1 hour cache
    pub fn image_fetcher(&self) -> Fetcher {
        let portal = PortalClient::new(self.config.portal.clone());
        ImageFetcher::new(
            MediaClassifier::new(self.config.portal.domain.clone()),
            CachedPortalClient::new(portal, self.cache_enabled),
        )
    }

    /// Classifier for the configured portal domain
    pub fn classifier(&self) -> MediaClassifier {
        MediaClassifier::new(self.config.portal.domain.clone())
    }
}
