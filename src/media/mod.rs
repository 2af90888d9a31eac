//! Media references attached to complaint records
//!
//! A record's `media_url` arrives either as a bare string or as an object
//! with a `url` (and usually a `description`). It is normalized into a
//! [`MediaReference`] once, at ingestion, and classified from there.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub mod classify;
pub mod fetcher;

pub use classify::{ClassifiedMedia, MediaClassifier, MediaKind};
pub use fetcher::{ImageFetcher, NoImage, ResolvedImage};

/// Raw media value from a feed record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaReference {
    /// Bare URL string
    Url(String),

    /// Object form: `{"url": "...", "description": "..."}`
    Structured {
        #[serde(default)]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl MediaReference {
    /// Build a reference from an arbitrary JSON value.
    ///
    /// Anything other than a string or an object (numbers, arrays, null)
    /// yields `None` rather than an error so one odd record cannot poison
    /// a whole feed page.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(MediaReference::Url(s.clone())),
            Value::Object(map) => Some(MediaReference::Structured {
                url: map.get("url").and_then(Value::as_str).map(str::to_string),
                description: map
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            _ => None,
        }
    }

    /// Parse a command-line argument: a JSON object or a bare URL
    pub fn parse_arg(arg: &str) -> Option<Self> {
        let trimmed = arg.trim();
        if trimmed.starts_with('{') {
            serde_json::from_str::<Value>(trimmed)
                .ok()
                .and_then(|v| Self::from_value(&v))
        } else if trimmed.is_empty() {
            None
        } else {
            Some(MediaReference::Url(trimmed.to_string()))
        }
    }

    /// The single logical URL, if one is present and non-blank
    pub fn url(&self) -> Option<&str> {
        let raw = match self {
            MediaReference::Url(url) => Some(url.as_str()),
            MediaReference::Structured { url, .. } => url.as_deref(),
        };
        raw.map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Lenient deserializer for the `media_url` field of a feed record
pub fn deserialize_media<'de, D>(deserializer: D) -> Result<Option<MediaReference>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(MediaReference::from_value))
}
