//! Common CLI types shared across commands

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty format - colored cards, one block per report
    #[default]
    Pretty,
    /// Table format - one row per report
    Table,
    /// JSON format - structured for scripts
    Json,
}

/// Which cache entries a command applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CacheKind {
    /// Feed pages (5 minute TTL)
    Feed,
    /// Unwrapped portal images (1 hour TTL)
    Portal,
}

impl CacheKind {
    /// Endpoint label stored with the cache entries
    pub fn endpoint(self) -> &'static str {
        match self {
            CacheKind::Feed => crate::cache::endpoint::FEED,
            CacheKind::Portal => crate::cache::endpoint::PORTAL_IMAGE,
        }
    }
}
