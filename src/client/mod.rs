//! Upstream open-data feed client

use async_trait::async_trait;

use crate::error::Result;

pub mod feed;
pub mod models;
pub mod parallel;

pub use feed::{FeedClient, FeedQuery, LOAD_MORE_INCREMENT};
pub use models::ComplaintRecord;
pub use parallel::map_bounded;

/// Open-data feed API
#[async_trait]
pub trait FeedApi: Send + Sync {
    /// Fetch records matching the query, newest first
    async fn fetch_records(&self, query: &FeedQuery) -> Result<Vec<ComplaintRecord>>;
}
