//! Portal client: session, selection and download for one wrapper URL

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;

use super::attachments::select_attachment;
use super::payload::download_attachment;
use super::session::PortalSession;
use super::{PortalApi, PortalResult};
use crate::config::PortalConfig;

/// Request throttle shared by every session a client creates
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Build a limiter allowing `per_second` portal requests per second
pub fn new_limiter(per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Resolves portal wrapper URLs into image bytes.
///
/// Holds configuration and the rate limiter only; every call to
/// [`PortalApi::fetch_image`] gets a fresh [`PortalSession`].
pub struct PortalClient {
    config: PortalConfig,
    limiter: Arc<Limiter>,
}

impl PortalClient {
    pub fn new(config: PortalConfig) -> Self {
        let limiter = new_limiter(config.requests_per_second);
        Self { config, limiter }
    }
}

#[async_trait]
impl PortalApi for PortalClient {
    async fn fetch_image(&self, wrapper_url: &str) -> PortalResult<Vec<u8>> {
        let session =
            PortalSession::establish(wrapper_url, &self.config, self.limiter.clone()).await?;
        let filename = select_attachment(&session, self.config.selection_policy).await?;
        let bytes = download_attachment(&session, &filename).await?;

        debug!(
            "Case {}: decoded {} bytes from {}",
            session.case_id(),
            bytes.len(),
            filename
        );
        Ok(bytes)
    }
}
