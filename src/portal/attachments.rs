//! Attachment listing and primary-photo selection

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::session::PortalSession;
use super::{PortalError, PortalResult};

/// Custom action that lists a case's attachment filenames
pub const LIST_ACTION: &str = "get_attachments_details";

/// Substrings marking auto-generated location-map thumbnails
const MAP_ARTIFACT_MARKERS: [&str; 3] = ["m.jpg", "_map.jpg", "_map.jpeg"];

/// Extensions accepted by the strict policy
const PHOTO_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// How to choose the primary photo among a case's attachments.
///
/// Both policies skip blank names and map thumbnails. They only differ when
/// a non-image attachment (a PDF, say) is listed before the photo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// First name ending in `.jpg`, `.jpeg` or `.png`
    #[default]
    ImageExtension,
    /// First name that is not a map thumbnail
    FirstNonMap,
}

/// Filenames attached to one case, in portal order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentListing {
    filenames: Vec<String>,
}

impl AttachmentListing {
    /// Split a semicolon-delimited `formdata_filenames` value
    pub fn parse(raw: &str) -> Self {
        Self {
            filenames: raw
                .split(';')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Extract the listing from a `get_attachments_details` response body
    pub fn from_response(body: &Value) -> PortalResult<Self> {
        let data = body
            .get("data")
            .ok_or_else(|| PortalError::MalformedResponse("missing `data` object".into()))?;

        let listing = match data.get("formdata_filenames") {
            Some(Value::String(raw)) => Self::parse(raw),
            Some(Value::Null) | None => Self::default(),
            Some(other) => {
                return Err(PortalError::MalformedResponse(format!(
                    "`formdata_filenames` is not a string: {}",
                    other
                )));
            }
        };

        if listing.is_empty() {
            return Err(PortalError::NoAttachments);
        }
        Ok(listing)
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    /// Pick the primary photo; first eligible name in listed order wins
    pub fn select(&self, policy: SelectionPolicy) -> Option<&str> {
        self.filenames
            .iter()
            .map(String::as_str)
            .filter(|name| !is_map_artifact(name))
            .find(|name| match policy {
                SelectionPolicy::ImageExtension => has_photo_extension(name),
                SelectionPolicy::FirstNonMap => true,
            })
    }
}

/// Ask the portal for the case's attachments and choose one
pub async fn select_attachment(
    session: &PortalSession,
    policy: SelectionPolicy,
) -> PortalResult<String> {
    let body = session.custom_action(LIST_ACTION, &[]).await?;
    let listing = AttachmentListing::from_response(&body)?;

    match listing.select(policy) {
        Some(name) => {
            debug!(
                "Case {}: selected {} of {:?}",
                session.case_id(),
                name,
                listing.filenames()
            );
            Ok(name.to_string())
        }
        None => {
            debug!(
                "Case {}: no eligible attachment in {:?}",
                session.case_id(),
                listing.filenames()
            );
            Err(PortalError::NoEligibleAttachment)
        }
    }
}

fn is_map_artifact(name: &str) -> bool {
    let lower = name.to_lowercase();
    MAP_ARTIFACT_MARKERS.iter().any(|m| lower.contains(m))
}

fn has_photo_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    PHOTO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
