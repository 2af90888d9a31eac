//! JSON output formatting

use chrono::Utc;
use serde::Serialize;

/// Wrapper for JSON output with metadata
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub data: T,
    pub meta: Metadata,
}

/// Metadata included in JSON output
#[derive(Debug, Serialize)]
pub struct Metadata {
    /// RFC 3339 generation time
    pub timestamp: String,

    /// CLI version
    pub version: String,
}

impl<T> JsonOutput<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Format data as pretty-printed JSON inside the `data`/`meta` envelope
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct Entry {
        request_id: String,
        category: Option<String>,
    }

    #[test]
    fn test_json_output_meta() {
        let output = JsonOutput::new(vec!["a"]);

        assert_eq!(output.meta.version, env!("CARGO_PKG_VERSION"));
        assert!(!output.meta.timestamp.is_empty());
    }

    #[test]
    fn test_format_json_envelope() {
        let entries = vec![Entry {
            request_id: "101".to_string(),
            category: None,
        }];

        let value: serde_json::Value =
            serde_json::from_str(&format_json(&entries).unwrap()).unwrap();

        assert_eq!(value["data"][0]["request_id"], "101");
        assert!(value["data"][0]["category"].is_null());
        assert!(value["meta"]["timestamp"].is_string());
    }

    #[test]
    fn test_format_json_empty_slice() {
        let entries: Vec<Entry> = vec![];
        assert!(format_json(&entries).unwrap().contains("\"data\": []"));
    }
}
