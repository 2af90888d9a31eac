//! Local TTL cache for feed pages and unwrapped portal images
//!
//! SQLite-backed, with large entries spilled to blob files. Entries expire
//! on their own and are pruned whenever the store is opened; `cache clear`
//! removes live entries early.

pub mod client;
pub mod key;
pub mod storage;

use std::time::Duration;

/// Cache TTL per data type
pub struct CacheTtl;

impl CacheTtl {
    // New reports arrive continuously
    pub const FEED: Duration = Duration::from_secs(5 * 60); // 5 min

    // A case's attachments rarely change once filed
    pub const PORTAL_IMAGE: Duration = Duration::from_secs(60 * 60); // 1 hr
}

/// Endpoint labels stored alongside entries (used by `cache clear --kind`)
pub mod endpoint {
    pub const FEED: &str = "feed";
    pub const PORTAL_IMAGE: &str = "portal_image";
}

// Re-export main types
pub use client::{CachedFeedClient, CachedPortalClient};
pub use key::cache_key;
pub use storage::CacheStorage;
