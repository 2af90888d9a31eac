//! Feed record models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::media::{MediaReference, deserialize_media};

/// Marker that operators put in `status_notes` for duplicate reports
const DUPLICATE_MARKER: &str = "duplicate";

/// One 311 case as returned by the open-data feed.
///
/// Only the fields civicgrid uses are modeled; the feed returns many more.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintRecord {
    /// Case number
    #[serde(default)]
    pub service_request_id: Option<String>,

    /// Floating timestamp, e.g. `2024-05-01T13:45:12.000`
    #[serde(default)]
    pub requested_datetime: Option<String>,

    /// Top-level category, e.g. "Encampment"
    #[serde(default)]
    pub service_name: Option<String>,

    #[serde(default)]
    pub service_subtype: Option<String>,

    /// Free-text address
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub status_description: Option<String>,

    /// Operator notes; duplicates are flagged here
    #[serde(default)]
    pub status_notes: Option<String>,

    #[serde(default)]
    pub analysis_neighborhood: Option<String>,

    /// Photo reference; tolerant of any JSON shape
    #[serde(default, deserialize_with = "deserialize_media")]
    pub media_url: Option<MediaReference>,
}

impl ComplaintRecord {
    /// Whether operators marked this case as a duplicate
    pub fn is_duplicate(&self) -> bool {
        self.status_notes
            .as_deref()
            .is_some_and(|notes| notes.to_lowercase().contains(DUPLICATE_MARKER))
    }

    /// Parsed request timestamp, if present and well-formed
    pub fn requested_at(&self) -> Option<NaiveDateTime> {
        let raw = self.requested_datetime.as_deref()?;
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
    }
}
