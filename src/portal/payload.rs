//! Attachment download and base64 payload decoding

use base64::{Engine as _, engine::general_purpose};
use serde_json::Value;

use super::session::PortalSession;
use super::{PortalError, PortalResult};

/// Custom action that returns one attachment's content
pub const DOWNLOAD_ACTION: &str = "download_attachments";

/// Download `filename` for the session's case and decode it to raw bytes
pub async fn download_attachment(session: &PortalSession, filename: &str) -> PortalResult<Vec<u8>> {
    let body = session
        .custom_action(DOWNLOAD_ACTION, &[("filename", filename)])
        .await?;

    let encoded = body
        .get("data")
        .and_then(|d| d.get("txt_file"))
        .and_then(Value::as_str)
        .ok_or_else(|| PortalError::MalformedResponse("missing `data.txt_file`".into()))?;

    decode_payload(encoded)
}

/// Decode a base64 attachment, dropping any `data:...;base64,` prefix.
///
/// Everything up to and including the first comma is treated as the prefix.
/// Whitespace (the portal sometimes wraps long payloads) is ignored.
pub fn decode_payload(encoded: &str) -> PortalResult<Vec<u8>> {
    let body = match encoded.split_once(',') {
        Some((_, rest)) => rest,
        None => encoded,
    };
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.is_empty() {
        return Err(PortalError::Decode("empty payload".to_string()));
    }

    general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| PortalError::Decode(e.to_string()))
}
