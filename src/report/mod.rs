//! Report pipeline: feed records in, displayable report items out
//!
//! Duplicates and records without usable media are dropped. Portal images
//! are resolved with bounded concurrency; a failed resolution degrades to a
//! link to the portal page instead of removing the report.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;

use crate::client::{ComplaintRecord, FeedApi, FeedQuery, map_bounded};
use crate::media::{ClassifiedMedia, ImageFetcher, MediaKind, NoImage, ResolvedImage};
use crate::portal::PortalApi;

/// Placeholder when a record has no request timestamp
const UNKNOWN_DATE: &str = "?";

/// Placeholder when a record has no address
const UNKNOWN_ADDRESS: &str = "Location N/A";

/// How a report's photo can be shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageOutcome {
    /// Public image URL
    Url { url: String },
    /// Image decoded from the portal
    Decoded {
        bytes: usize,
        #[serde(skip)]
        data: Vec<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        saved_to: Option<String>,
    },
    /// Portal page the user can open by hand
    Link {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// One report ready for display
#[derive(Debug, Clone, Serialize)]
pub struct ReportItem {
    pub request_id: Option<String>,
    /// e.g. `May 01, 01:45 PM`
    pub date: String,
    /// Address up to the first comma
    pub short_address: String,
    pub address: Option<String>,
    pub map_url: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub image: ImageOutcome,
}

/// Options for building reports
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Unwrap portal links (false leaves them as links)
    pub resolve_portal: bool,
    /// Portal resolutions in flight at once
    pub max_concurrent: usize,
}

/// Fetch the feed, treating any failure as an empty page
pub async fn load_feed<F: FeedApi + ?Sized>(feed: &F, query: &FeedQuery) -> Vec<ComplaintRecord> {
    match feed.fetch_records(query).await {
        Ok(records) => records,
        Err(e) => {
            warn!("Feed unavailable, showing no records: {}", e);
            Vec::new()
        }
    }
}

/// Turn feed records into report items, preserving feed order
pub async fn build_reports<P: PortalApi>(
    records: Vec<ComplaintRecord>,
    fetcher: &ImageFetcher<P>,
    options: &ReportOptions,
) -> Vec<ReportItem> {
    let candidates: Vec<(ComplaintRecord, ClassifiedMedia)> = records
        .into_iter()
        .filter(|record| {
            let duplicate = record.is_duplicate();
            if duplicate {
                debug!("Skipping duplicate {:?}", record.service_request_id);
            }
            !duplicate
        })
        .filter_map(|record| {
            let classified = fetcher.classifier().classify(record.media_url.as_ref());
            if classified.kind == MediaKind::Unusable {
                debug!("Skipping {:?}: no usable media", record.service_request_id);
                return None;
            }
            Some((record, classified))
        })
        .collect();

    map_bounded(
        candidates,
        move |(record, classified)| async move {
            let image = resolve_outcome(fetcher, &classified, options.resolve_portal).await;
            to_item(record, image)
        },
        options.max_concurrent,
    )
    .await
}

async fn resolve_outcome<P: PortalApi>(
    fetcher: &ImageFetcher<P>,
    classified: &ClassifiedMedia,
    resolve_portal: bool,
) -> ImageOutcome {
    if classified.kind == MediaKind::PortalWrapper && !resolve_portal {
        return ImageOutcome::Link {
            url: classified.url.clone(),
            reason: None,
        };
    }

    match fetcher.resolve(classified).await {
        Ok(ResolvedImage::Direct(url)) => ImageOutcome::Url { url },
        Ok(ResolvedImage::Decoded(data)) => ImageOutcome::Decoded {
            bytes: data.len(),
            data,
            saved_to: None,
        },
        Err(NoImage::Portal(reason)) => {
            debug!("Portal unresolved for {}: {}", classified.url, reason);
            ImageOutcome::Link {
                url: classified.url.clone(),
                reason: Some(reason.to_string()),
            }
        }
        Err(NoImage::Unusable) => ImageOutcome::Link {
            url: classified.url.clone(),
            reason: None,
        },
    }
}

fn to_item(record: ComplaintRecord, image: ImageOutcome) -> ReportItem {
    let date = record
        .requested_at()
        .map(|at| at.format("%b %d, %I:%M %p").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    let address = record
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);
    let short_address = address
        .as_deref()
        .map(short_address)
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string());
    let map_url = address.as_deref().map(map_search_url);

    ReportItem {
        request_id: record.service_request_id,
        date,
        short_address,
        address,
        map_url,
        category: record.service_name,
        status: record.status_description,
        image,
    }
}

/// Text before the first comma
pub fn short_address(address: &str) -> String {
    address.split(',').next().unwrap_or(address).trim().to_string()
}

/// Map search link for a free-text address
pub fn map_search_url(address: &str) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        address.replace(' ', "+")
    )
}

/// File extension matching an image's magic bytes
pub fn image_extension(data: &[u8]) -> &'static str {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [0x89, b'P', b'N', b'G', ..] => "png",
        [b'G', b'I', b'F', b'8', ..] => "gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        [b'B', b'M', ..] => "bmp",
        _ => "bin",
    }
}

/// Write every decoded image into `dir`, recording where each went.
///
/// Files are named after the request id (or the item's position when the
/// record has none); ids that sanitize to the same name get a `-2`, `-3`
/// suffix. A file that cannot be written is logged and skipped. Returns the
/// number of files written.
pub fn save_decoded_images(items: &mut [ReportItem], dir: &Path) -> std::io::Result<usize> {
    std::fs::create_dir_all(dir)?;

    let mut taken = HashSet::new();
    let mut written = 0;
    for (index, item) in items.iter_mut().enumerate() {
        let stem = item
            .request_id
            .as_deref()
            .map(sanitize_file_stem)
            .unwrap_or_else(|| format!("report-{}", index + 1));

        if let ImageOutcome::Decoded { data, saved_to, .. } = &mut item.image {
            let extension = image_extension(data);
            let mut file_name = format!("{}.{}", stem, extension);
            let mut suffix = 2;
            while !taken.insert(file_name.clone()) {
                file_name = format!("{}-{}.{}", stem, suffix, extension);
                suffix += 1;
            }

            let path: PathBuf = dir.join(&file_name);
            match std::fs::write(&path, data.as_slice()) {
                Ok(()) => {
                    *saved_to = Some(path.display().to_string());
                    written += 1;
                }
                Err(e) => warn!("Could not save image {}: {}", path.display(), e),
            }
        }
    }
    Ok(written)
}

fn sanitize_file_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
