//! Image fetcher: the single entry point for turning media into images

use log::debug;
use thiserror::Error;

use super::classify::{ClassifiedMedia, MediaClassifier, MediaKind};
use super::MediaReference;
use crate::portal::{PortalApi, PortalError};

/// A displayable image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    /// Public URL; the consumer renders it directly
    Direct(String),
    /// Bytes decoded from a portal attachment
    Decoded(Vec<u8>),
}

/// Why a reference produced no image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoImage {
    #[error("media reference is missing or not displayable")]
    Unusable,

    #[error(transparent)]
    Portal(#[from] PortalError),
}

/// Classifies media and unwraps portal links through a [`PortalApi`]
pub struct ImageFetcher<P: PortalApi> {
    classifier: MediaClassifier,
    portal: P,
}

impl<P: PortalApi> ImageFetcher<P> {
    pub fn new(classifier: MediaClassifier, portal: P) -> Self {
        Self { classifier, portal }
    }

    pub fn classifier(&self) -> &MediaClassifier {
        &self.classifier
    }

    #[cfg(test)]
    pub(crate) fn portal(&self) -> &P {
        &self.portal
    }

    /// Classify and resolve a media reference
    pub async fn try_fetch(
        &self,
        reference: Option<&MediaReference>,
    ) -> Result<ResolvedImage, NoImage> {
        let classified = self.classifier.classify(reference);
        self.resolve(&classified).await
    }

    /// Resolve an already-classified reference
    pub async fn resolve(&self, classified: &ClassifiedMedia) -> Result<ResolvedImage, NoImage> {
        match classified.kind {
            MediaKind::DirectImage => Ok(ResolvedImage::Direct(classified.url.clone())),
            MediaKind::PortalWrapper => {
                let bytes = self
                    .portal
                    .fetch_image(&classified.url)
                    .await
                    .inspect_err(|e| debug!("Portal unwrap failed for {}: {}", classified.url, e))?;
                Ok(ResolvedImage::Decoded(bytes))
            }
            MediaKind::Unusable => Err(NoImage::Unusable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::PortalResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Portal double that records which URLs it was asked for
    struct RecordingPortal {
        result: PortalResult<Vec<u8>>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingPortal {
        fn returning(result: PortalResult<Vec<u8>>) -> Self {
            Self {
                result,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PortalApi for RecordingPortal {
        async fn fetch_image(&self, wrapper_url: &str) -> PortalResult<Vec<u8>> {
            self.calls.lock().unwrap().push(wrapper_url.to_string());
            self.result.clone()
        }
    }

    fn fetcher(portal: RecordingPortal) -> ImageFetcher<RecordingPortal> {
        ImageFetcher::new(MediaClassifier::new("example-cloud.com"), portal)
    }

    #[tokio::test]
    async fn test_direct_image_needs_no_portal() {
        let f = fetcher(RecordingPortal::returning(Ok(vec![1])));
        let reference = MediaReference::Url("https://cdn.example.com/photo.jpg?x=1".into());

        let image = f.try_fetch(Some(&reference)).await.unwrap();

        assert_eq!(
            image,
            ResolvedImage::Direct("https://cdn.example.com/photo.jpg?x=1".to_string())
        );
        assert!(f.portal.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_portal_wrapper_decodes() {
        let f = fetcher(RecordingPortal::returning(Ok(vec![0xFF, 0xD8])));
        let url = "https://portal.example-cloud.com/download_attachments?caseid=987";
        let reference = MediaReference::Url(url.into());

        let image = f.try_fetch(Some(&reference)).await.unwrap();

        assert_eq!(image, ResolvedImage::Decoded(vec![0xFF, 0xD8]));
        assert_eq!(*f.portal.calls.lock().unwrap(), vec![url.to_string()]);
    }

    #[tokio::test]
    async fn test_portal_failure_keeps_reason() {
        let f = fetcher(RecordingPortal::returning(Err(PortalError::MissingFormRef)));
        let reference =
            MediaReference::Url("https://portal.example-cloud.com/x?caseid=987".into());

        let err = f.try_fetch(Some(&reference)).await.unwrap_err();
        assert_eq!(err, NoImage::Portal(PortalError::MissingFormRef));
    }

    #[tokio::test]
    async fn test_unusable_never_calls_portal() {
        let f = fetcher(RecordingPortal::returning(Ok(vec![1])));

        assert_eq!(f.try_fetch(None).await.unwrap_err(), NoImage::Unusable);
        let link = MediaReference::Url("https://sf.gov/case/1".into());
        assert_eq!(f.try_fetch(Some(&link)).await.unwrap_err(), NoImage::Unusable);
        assert!(f.portal.calls.lock().unwrap().is_empty());
    }
}
