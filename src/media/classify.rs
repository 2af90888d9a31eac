//! Media classification: direct image, portal wrapper, or unusable

use serde::Serialize;
use url::Url;

use super::MediaReference;

/// Suffixes treated as directly displayable images
const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp"];

/// What a media reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Public image URL, displayable as-is
    DirectImage,
    /// Attachment portal page that has to be unwrapped
    PortalWrapper,
    /// Nothing worth displaying
    Unusable,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MediaKind::DirectImage => "direct image",
            MediaKind::PortalWrapper => "portal wrapper",
            MediaKind::Unusable => "unusable",
        };
        f.write_str(label)
    }
}

/// Classification result; `url` is empty when no URL could be extracted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedMedia {
    pub kind: MediaKind,
    pub url: String,
}

impl ClassifiedMedia {
    fn unusable(url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Unusable,
            url: url.into(),
        }
    }
}

/// Classifies media references against a known portal domain
#[derive(Debug, Clone)]
pub struct MediaClassifier {
    portal_domain: String,
}

impl MediaClassifier {
    pub fn new(portal_domain: impl Into<String>) -> Self {
        Self {
            portal_domain: portal_domain.into().to_lowercase(),
        }
    }

    /// Classify a (possibly absent) media reference
    pub fn classify(&self, reference: Option<&MediaReference>) -> ClassifiedMedia {
        let Some(url) = reference.and_then(MediaReference::url) else {
            return ClassifiedMedia::unusable("");
        };

        if has_image_extension(url) {
            return ClassifiedMedia {
                kind: MediaKind::DirectImage,
                url: url.to_string(),
            };
        }

        if self.is_portal_host(url) {
            return ClassifiedMedia {
                kind: MediaKind::PortalWrapper,
                url: url.to_string(),
            };
        }

        ClassifiedMedia::unusable(url)
    }

    fn is_portal_host(&self, url: &str) -> bool {
        if self.portal_domain.is_empty() {
            return false;
        }
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .is_some_and(|host| host.contains(&self.portal_domain))
    }
}

/// True when the URL, minus its query string, ends in an allow-listed suffix
fn has_image_extension(url: &str) -> bool {
    let path = url.split('?').next().unwrap_or(url).to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
