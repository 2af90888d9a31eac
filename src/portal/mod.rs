//! Verint citizen-portal attachment unwrapping
//!
//! Some feed records point at a portal "download attachments" page rather
//! than at an image. Getting the photo out takes four requests that share
//! one cookie jar:
//!
//! 1. load the wrapper page and scrape the `formref` and CSRF tokens
//! 2. bootstrap a citizen session (may hand back an `Authorization` value)
//! 3. list the case's attachment filenames
//! 4. download the chosen attachment as a base64 envelope
//!
//! Steps 1-2 live in [`session`], step 3 in [`attachments`], step 4 in
//! [`payload`]. [`PortalClient`] strings them together.

use async_trait::async_trait;
use thiserror::Error;

pub mod attachments;
pub mod client;
pub mod payload;
pub mod scrape;
pub mod session;

pub use attachments::SelectionPolicy;
pub use client::PortalClient;

/// Result alias for portal operations
pub type PortalResult<T> = std::result::Result<T, PortalError>;

/// Why a portal resolution produced no image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    #[error("wrapper URL could not be parsed: {0}")]
    InvalidUrl(String),

    #[error("wrapper URL has no caseid parameter")]
    MissingCaseId,

    #[error("wrapper page returned HTTP {0}")]
    PageLoad(u16),

    #[error("wrapper page has no formref token")]
    MissingFormRef,

    #[error("portal API returned HTTP {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed portal response: {0}")]
    MalformedResponse(String),

    #[error("case has no attachments")]
    NoAttachments,

    #[error("no attachment passed the selection policy")]
    NoEligibleAttachment,

    #[error("attachment payload could not be decoded: {0}")]
    Decode(String),
}

impl PortalError {
    /// Whether retrying later might produce a different answer.
    ///
    /// Definitive outcomes (no caseid, no attachments, only map thumbnails)
    /// can be cached; transient ones must not be.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortalError::PageLoad(_)
                | PortalError::Status(_)
                | PortalError::Network(_)
                | PortalError::MalformedResponse(_)
                | PortalError::MissingFormRef
        )
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PortalError::Network("request timed out".to_string())
        } else if err.is_connect() {
            PortalError::Network("failed to connect to portal".to_string())
        } else if err.is_decode() {
            PortalError::MalformedResponse(err.to_string())
        } else {
            PortalError::Network(err.to_string())
        }
    }
}

/// Turns a portal wrapper URL into decoded image bytes
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// Resolve the primary photo behind a wrapper URL
    async fn fetch_image(&self, wrapper_url: &str) -> PortalResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(PortalError::Network("timeout".into()).is_transient());
        assert!(PortalError::PageLoad(503).is_transient());
        assert!(PortalError::Status(500).is_transient());
        assert!(!PortalError::MissingCaseId.is_transient());
        assert!(!PortalError::NoAttachments.is_transient());
        assert!(!PortalError::NoEligibleAttachment.is_transient());
        assert!(!PortalError::Decode("bad".into()).is_transient());
    }

    #[test]
    fn test_error_messages() {
        assert!(PortalError::PageLoad(404).to_string().contains("404"));
        assert!(PortalError::MissingFormRef.to_string().contains("formref"));
    }
}
