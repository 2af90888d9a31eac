//! Read-through caching wrappers for the feed and portal clients

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Mutex;
use std::time::Duration;

use crate::cache::{CacheStorage, CacheTtl, cache_key, endpoint};
use crate::client::{ComplaintRecord, FeedApi, FeedQuery};
use crate::error::Result;
use crate::portal::{PortalApi, PortalError, PortalResult};

/// Shared get/put helpers over an optional storage handle.
///
/// `None` means caching is disabled (`--no-cache`, or the cache could not be
/// opened); every lookup misses and every store is a no-op.
struct ResponseCache {
    storage: Option<Mutex<CacheStorage>>,
}

impl ResponseCache {
    fn open(enabled: bool) -> Self {
        let storage = if enabled {
            match CacheStorage::open() {
                Ok(storage) => Some(Mutex::new(storage)),
                Err(e) => {
                    log::warn!("Cache unavailable, continuing without it: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Self { storage }
    }

    #[cfg(test)]
    fn with_storage(storage: CacheStorage) -> Self {
        Self {
            storage: Some(Mutex::new(storage)),
        }
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage = self.storage.as_ref()?;
        let guard = storage.lock().ok()?;
        guard
            .get(key)
            .ok()
            .flatten()
            .and_then(|data| serde_json::from_slice(&data).ok())
    }

    fn put<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        endpoint: &str,
        scope: Option<&str>,
        ttl: Duration,
    ) {
        if let Some(ref storage) = self.storage
            && let Ok(guard) = storage.lock()
            && let Ok(json) = serde_json::to_vec(data)
            && let Err(e) = guard.put(key, &json, endpoint, scope, ttl)
        {
            log::warn!("Failed to write cache entry for {}: {}", endpoint, e);
        }
    }
}

/// Cached wrapper for any [`FeedApi`] implementation (5 minute TTL)
pub struct CachedFeedClient<C: FeedApi> {
    inner: C,
    scope: String,
    cache: ResponseCache,
}

impl<C: FeedApi> CachedFeedClient<C> {
    /// Wrap `inner`; `scope` (the feed endpoint) keeps different feeds apart
    pub fn new(inner: C, scope: impl Into<String>, enabled: bool) -> Self {
        Self {
            inner,
            scope: scope.into(),
            cache: ResponseCache::open(enabled),
        }
    }

    /// Wrap `inner` with an explicit storage location
    #[cfg(test)]
    pub fn with_storage(inner: C, scope: impl Into<String>, storage: CacheStorage) -> Self {
        Self {
            inner,
            scope: scope.into(),
            cache: ResponseCache::with_storage(storage),
        }
    }
}

#[async_trait]
impl<C: FeedApi> FeedApi for CachedFeedClient<C> {
    async fn fetch_records(&self, query: &FeedQuery) -> Result<Vec<ComplaintRecord>> {
        let params = query.cache_params();
        let params_ref: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let key = cache_key(endpoint::FEED, Some(&self.scope), &params_ref);

        if let Some(cached) = self.cache.get(&key) {
            log::debug!("Cache hit: feed");
            return Ok(cached);
        }

        let result = self.inner.fetch_records(query).await?;
        self.cache.put(
            &key,
            &result,
            endpoint::FEED,
            Some(&self.scope),
            CacheTtl::FEED,
        );
        Ok(result)
    }
}

/// What the cache remembers about one wrapper URL
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum CachedResolution {
    /// Base64 of the decoded image bytes
    Image { data: String },
    NoAttachments,
    NoEligibleAttachment,
    MissingCaseId,
}

impl CachedResolution {
    /// Convert a resolution outcome; transient failures are not cacheable
    fn from_outcome(outcome: &PortalResult<Vec<u8>>) -> Option<Self> {
        match outcome {
            Err(e) if e.is_transient() => None,
            Ok(bytes) => Some(CachedResolution::Image {
                data: general_purpose::STANDARD.encode(bytes),
            }),
            Err(PortalError::NoAttachments) => Some(CachedResolution::NoAttachments),
            Err(PortalError::NoEligibleAttachment) => Some(CachedResolution::NoEligibleAttachment),
            Err(PortalError::MissingCaseId) => Some(CachedResolution::MissingCaseId),
            Err(_) => None,
        }
    }

    fn into_outcome(self) -> Option<PortalResult<Vec<u8>>> {
        match self {
            CachedResolution::Image { data } => general_purpose::STANDARD
                .decode(data.as_bytes())
                .ok()
                .map(Ok),
            CachedResolution::NoAttachments => Some(Err(PortalError::NoAttachments)),
            CachedResolution::NoEligibleAttachment => {
                Some(Err(PortalError::NoEligibleAttachment))
            }
            CachedResolution::MissingCaseId => Some(Err(PortalError::MissingCaseId)),
        }
    }
}

/// Cached wrapper for any [`PortalApi`] implementation (1 hour TTL).
///
/// Keyed by wrapper URL. Successful images and definitive "nothing to show"
/// outcomes are cached; network and page-load failures are retried on the
/// next run.
pub struct CachedPortalClient<P: PortalApi> {
    inner: P,
    cache: ResponseCache,
}

impl<P: PortalApi> CachedPortalClient<P> {
    pub fn new(inner: P, enabled: bool) -> Self {
        Self {
            inner,
            cache: ResponseCache::open(enabled),
        }
    }

    #[cfg(test)]
    pub fn with_storage(inner: P, storage: CacheStorage) -> Self {
        Self {
            inner,
            cache: ResponseCache::with_storage(storage),
        }
    }
}

#[async_trait]
impl<P: PortalApi> PortalApi for CachedPortalClient<P> {
    async fn fetch_image(&self, wrapper_url: &str) -> PortalResult<Vec<u8>> {
        let key = cache_key(endpoint::PORTAL_IMAGE, None, &[("url", wrapper_url)]);

        if let Some(outcome) = self
            .cache
            .get::<CachedResolution>(&key)
            .and_then(CachedResolution::into_outcome)
        {
            log::debug!("Cache hit: portal image {}", wrapper_url);
            return outcome;
        }

        let outcome = self.inner.fetch_image(wrapper_url).await;
        if let Some(entry) = CachedResolution::from_outcome(&outcome) {
            self.cache.put(
                &key,
                &entry,
                endpoint::PORTAL_IMAGE,
                None,
                CacheTtl::PORTAL_IMAGE,
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedConfig;
    use crate::error::ApiError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingFeed {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl FeedApi for CountingFeed {
        async fn fetch_records(&self, _query: &FeedQuery) -> Result<Vec<ComplaintRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ApiError::Network("down".to_string()).into());
            }
            Ok(vec![ComplaintRecord {
                service_request_id: Some("1".to_string()),
                ..Default::default()
            }])
        }
    }

    struct CountingPortal {
        calls: AtomicUsize,
        outcome: PortalResult<Vec<u8>>,
    }

    #[async_trait]
    impl PortalApi for CountingPortal {
        async fn fetch_image(&self, _wrapper_url: &str) -> PortalResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn storage() -> (CacheStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        (CacheStorage::open_at(dir.path()).unwrap(), dir)
    }

    fn query() -> FeedQuery {
        FeedQuery::from_config(&FeedConfig::default(), 1, chrono::Local::now().naive_local())
    }

    #[tokio::test]
    async fn test_feed_second_call_hits_cache() {
        let (storage, _dir) = storage();
        let inner = CountingFeed {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let client = CachedFeedClient::with_storage(inner, "https://feed.test", storage);

        let first = client.fetch_records(&query()).await.unwrap();
        let second = client.fetch_records(&query()).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second[0].service_request_id.as_deref(), Some("1"));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_feed_errors_are_not_cached() {
        let (storage, _dir) = storage();
        let inner = CountingFeed {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let client = CachedFeedClient::with_storage(inner, "https://feed.test", storage);

        assert!(client.fetch_records(&query()).await.is_err());
        assert!(client.fetch_records(&query()).await.is_err());
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_feed_different_limits_are_separate_entries() {
        let (storage, _dir) = storage();
        let inner = CountingFeed {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let client = CachedFeedClient::with_storage(inner, "https://feed.test", storage);

        client.fetch_records(&query()).await.unwrap();
        client.fetch_records(&query().load_more(300)).await.unwrap();
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_portal_image_is_cached() {
        let (storage, _dir) = storage();
        let inner = CountingPortal {
            calls: AtomicUsize::new(0),
            outcome: Ok(vec![0xFF, 0xD8, 0x00, 0x7F]),
        };
        let client = CachedPortalClient::with_storage(inner, storage);

        let first = client.fetch_image("https://p.test/?caseid=1").await.unwrap();
        let second = client.fetch_image("https://p.test/?caseid=1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, vec![0xFF, 0xD8, 0x00, 0x7F]);
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_portal_definitive_failure_is_cached() {
        let (storage, _dir) = storage();
        let inner = CountingPortal {
            calls: AtomicUsize::new(0),
            outcome: Err(PortalError::NoEligibleAttachment),
        };
        let client = CachedPortalClient::with_storage(inner, storage);

        for _ in 0..2 {
            assert_eq!(
                client.fetch_image("https://p.test/?caseid=2").await,
                Err(PortalError::NoEligibleAttachment)
            );
        }
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_portal_transient_failure_is_retried() {
        let (storage, _dir) = storage();
        let inner = CountingPortal {
            calls: AtomicUsize::new(0),
            outcome: Err(PortalError::Network("timed out".to_string())),
        };
        let client = CachedPortalClient::with_storage(inner, storage);

        assert!(client.fetch_image("https://p.test/?caseid=3").await.is_err());
        assert!(client.fetch_image("https://p.test/?caseid=3").await.is_err());
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_delegates() {
        let inner = CountingPortal {
            calls: AtomicUsize::new(0),
            outcome: Ok(vec![1, 2, 3]),
        };
        let client = CachedPortalClient::new(inner, false);

        client.fetch_image("https://p.test/?caseid=4").await.unwrap();
        client.fetch_image("https://p.test/?caseid=4").await.unwrap();
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 2);
    }
}
