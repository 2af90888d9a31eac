//! Display model implementations for table, pretty and JSON output
//!
//! Display models flatten report items and classifications into
//! CLI-friendly rows with appropriate column names.

use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::media::ClassifiedMedia;
use crate::report::{ImageOutcome, ReportItem};

/// Truncate string to max length with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// One-line summary of an image outcome
pub fn describe_image(image: &ImageOutcome) -> String {
    match image {
        ImageOutcome::Url { url } => url.clone(),
        ImageOutcome::Decoded {
            bytes, saved_to, ..
        } => match saved_to {
            Some(path) => format!("decoded {} -> {}", format_bytes(*bytes), path),
            None => format!("decoded {}", format_bytes(*bytes)),
        },
        ImageOutcome::Link { url, .. } => format!("open: {}", url),
    }
}

/// Report display model for table output.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ReportDisplay {
    #[tabled(rename = "DATE")]
    pub date: String,

    /// Address up to the first comma
    #[tabled(rename = "ADDRESS")]
    pub address: String,

    #[tabled(rename = "CATEGORY")]
    pub category: String,

    /// Image URL, decoded size, or fallback link
    #[tabled(rename = "IMAGE")]
    pub image: String,
}

impl From<&ReportItem> for ReportDisplay {
    fn from(item: &ReportItem) -> Self {
        Self {
            date: item.date.clone(),
            address: item.short_address.clone(),
            category: item.category.clone().unwrap_or_else(|| "--".to_string()),
            image: truncate_string(&describe_image(&item.image), 70),
        }
    }
}

/// Classification display model for `classify`
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ClassifyDisplay {
    #[tabled(rename = "KIND")]
    pub kind: String,

    #[tabled(rename = "URL")]
    pub url: String,
}

impl From<&ClassifiedMedia> for ClassifyDisplay {
    fn from(media: &ClassifiedMedia) -> Self {
        let url = if media.url.is_empty() {
            "--".to_string()
        } else {
            media.url.clone()
        };
        Self {
            kind: media.kind.to_string(),
            url,
        }
    }
}

/// Render reports as stacked cards, one block per report
pub fn format_cards(items: &[ReportItem]) -> String {
    if items.is_empty() {
        return "No reports found.".to_string();
    }

    let mut output = String::new();
    for item in items {
        output.push_str(&format!(
            "{}  {}\n",
            item.date.bold(),
            item.short_address.cyan()
        ));
        if let Some(ref category) = item.category {
            output.push_str(&format!("  {}\n", category));
        }
        if let Some(ref map_url) = item.map_url {
            output.push_str(&format!("  Map:   {}\n", map_url.dimmed()));
        }

        match &item.image {
            ImageOutcome::Url { url } => {
                output.push_str(&format!("  Image: {}\n", url));
            }
            ImageOutcome::Decoded { .. } => {
                output.push_str(&format!(
                    "  Image: {}\n",
                    describe_image(&item.image).green()
                ));
            }
            ImageOutcome::Link { url, reason } => {
                output.push_str(&format!("  {} {}\n", "Open Image Page:".yellow(), url));
                if let Some(reason) = reason {
                    output.push_str(&format!("  ({})\n", reason.dimmed()));
                }
            }
        }
        output.push('\n');
    }
    output.push_str(&format!("{} reports", items.len()));
    output
}
