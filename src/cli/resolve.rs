//! `resolve` and `classify` commands for a single media reference

use std::path::Path;

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::error::{Error, Result};
use crate::media::{MediaReference, ResolvedImage};
use crate::models::display::describe_image;
use crate::output::{self, format_json};
use crate::report::{ImageOutcome, image_extension};

/// Parse a MEDIA argument; blank or malformed input is unusable, not an error
fn parse_media(media: &str) -> Option<MediaReference> {
    let reference = MediaReference::parse_arg(media);
    if reference.is_none() {
        log::debug!("Media argument has no usable shape: {:?}", media);
    }
    reference
}

/// Classify a media reference without any network access
pub fn classify(opts: &GlobalOptions, media: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let classified = ctx.classifier().classify(parse_media(media).as_ref());
    output::print(&classified, ctx.format)
}

/// Resolve a media reference to an image, optionally writing decoded bytes
pub async fn run(opts: &GlobalOptions, media: &str, output_file: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let fetcher = ctx.image_fetcher();
    let reference = parse_media(media);

    let image = fetcher
        .try_fetch(reference.as_ref())
        .await
        .map_err(|reason| Error::Other(format!("No image: {}", reason)))?;

    let outcome = match image {
        ResolvedImage::Direct(url) => ImageOutcome::Url { url },
        ResolvedImage::Decoded(data) => {
            let saved_to = match output_file {
                Some(path) => {
                    std::fs::write(path, &data)?;
                    Some(path.display().to_string())
                }
                None => None,
            };
            ImageOutcome::Decoded {
                bytes: data.len(),
                data,
                saved_to,
            }
        }
    };

    match ctx.format {
        OutputFormat::Json => println!("{}", format_json(&outcome)?),
        _ => print_outcome(&outcome),
    }
    Ok(())
}

fn print_outcome(outcome: &ImageOutcome) {
    match outcome {
        ImageOutcome::Decoded {
            data,
            saved_to: None,
            ..
        } => {
            println!(
                "{} {} ({} image)",
                "✓".green(),
                describe_image(outcome),
                image_extension(data)
            );
            println!("Use --output FILE to save it");
        }
        ImageOutcome::Decoded { .. } => {
            println!("{} {}", "✓".green(), describe_image(outcome));
        }
        _ => println!("{}", describe_image(outcome)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_blank_is_unusable() {
        assert!(parse_media("  ").is_none());
    }

    #[test]
    fn test_parse_media_json_object() {
        let reference = parse_media(r#"{"url":"https://cdn.test/a.jpg","description":"x"}"#);
        assert_eq!(reference.unwrap().url(), Some("https://cdn.test/a.jpg"));
    }
}
