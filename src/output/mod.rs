//! Output formatting for CLI results

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::media::ClassifiedMedia;
use crate::models::{ClassifyDisplay, ReportDisplay, format_cards};
use crate::report::ReportItem;

pub mod json;
pub mod table;

pub use json::format_json;
pub use table::format_table;

/// Trait for types that can be formatted for output
pub trait Formattable {
    /// Format the data according to the specified format
    fn format(&self, format: OutputFormat) -> Result<String>;
}

/// Format and print data to stdout
pub fn print<T: Formattable + ?Sized>(data: &T, format: OutputFormat) -> Result<()> {
    let output = data.format(format)?;
    println!("{}", output);
    Ok(())
}

impl Formattable for [ReportItem] {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(format_cards(self)),
            OutputFormat::Table => {
                let rows: Vec<ReportDisplay> = self.iter().map(ReportDisplay::from).collect();
                Ok(format_table(&rows))
            }
            OutputFormat::Json => Ok(format_json(self)?),
        }
    }
}

impl Formattable for ClassifiedMedia {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(format_json(self)?),
            OutputFormat::Table => Ok(format_table(&[ClassifyDisplay::from(self)])),
            OutputFormat::Pretty => {
                let display = ClassifyDisplay::from(self);
                Ok(format!("{}: {}", display.kind, display.url))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use crate::report::ImageOutcome;

    fn items() -> Vec<ReportItem> {
        vec![ReportItem {
            request_id: Some("7".to_string()),
            date: "Jun 02, 09:05 AM".to_string(),
            short_address: "5TH ST".to_string(),
            address: Some("5TH ST, SAN FRANCISCO".to_string()),
            map_url: None,
            category: Some("General Request".to_string()),
            status: Some("Open".to_string()),
            image: ImageOutcome::Url {
                url: "https://cdn.test/a.jpg".to_string(),
            },
        }]
    }

    #[test]
    fn test_reports_as_json_envelope() {
        let text = items().as_slice().format(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["data"][0]["request_id"], "7");
        assert_eq!(value["data"][0]["image"]["kind"], "url");
        assert!(value["meta"]["version"].is_string());
    }

    #[test]
    fn test_reports_as_table() {
        let text = items().as_slice().format(OutputFormat::Table).unwrap();
        assert!(text.contains("DATE"));
        assert!(text.contains("5TH ST"));
        assert!(text.contains("https://cdn.test/a.jpg"));
    }

    #[test]
    fn test_empty_reports_table() {
        let empty: Vec<ReportItem> = Vec::new();
        assert_eq!(
            empty.as_slice().format(OutputFormat::Table).unwrap(),
            "No results found."
        );
    }

    #[test]
    fn test_classified_pretty() {
        let media = ClassifiedMedia {
            kind: MediaKind::DirectImage,
            url: "https://cdn.test/a.png".to_string(),
        };
        assert_eq!(
            media.format(OutputFormat::Pretty).unwrap(),
            "direct image: https://cdn.test/a.png"
        );
    }

    #[test]
    fn test_classified_json() {
        let media = ClassifiedMedia {
            kind: MediaKind::PortalWrapper,
            url: "https://p.test/?caseid=1".to_string(),
        };
        let text = media.format(OutputFormat::Json).unwrap();
        assert!(text.contains("\"kind\": \"portal_wrapper\""));
    }
}
