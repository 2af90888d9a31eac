//! `feed` command: recent reports with their photos

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::client::{FeedQuery, LOAD_MORE_INCREMENT};
use crate::error::Result;
use crate::output;
use crate::report::{ReportOptions, build_reports, load_feed, save_decoded_images};

/// Options specific to the feed command
#[derive(Debug, Clone)]
pub struct FeedArgs {
    /// Number of pages to request (first page plus "load more" steps)
    pub pages: usize,
    /// Directory to write decoded portal images into
    pub save_dir: Option<PathBuf>,
    /// Leave portal links unresolved
    pub no_resolve: bool,
}

/// Build the feed query for the requested number of pages.
///
/// The first page is `feed.page_size` records; each further page grows the
/// limit by [`LOAD_MORE_INCREMENT`].
pub fn query_for_pages(ctx: &CommandContext, pages: usize) -> FeedQuery {
    let first = FeedQuery::from_config(&ctx.config.feed, 1, Local::now().naive_local());
    (1..pages.max(1)).fold(first, |query, _| query.load_more(LOAD_MORE_INCREMENT))
}

/// Run the feed command
pub async fn run(opts: &GlobalOptions, args: &FeedArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let query = query_for_pages(&ctx, args.pages);
    let feed = ctx.feed_client()?;

    let spinner = spinner(ctx.format, "Loading reports...");
    let records = load_feed(&feed, &query).await;
    info!("Feed returned {} records", records.len());

    spinner.set_message(format!("Resolving photos for {} reports...", records.len()));
    let fetcher = ctx.image_fetcher();
    let options = ReportOptions {
        resolve_portal: !args.no_resolve,
        max_concurrent: ctx.config.portal.max_concurrent,
    };
    let mut items = build_reports(records, &fetcher, &options).await;
    spinner.finish_and_clear();

    if let Some(ref dir) = args.save_dir {
        let written = save_decoded_images(&mut items, dir)?;
        info!("Wrote {} images to {}", written, dir.display());
    }

    output::print(items.as_slice(), ctx.format)
}

/// Indeterminate spinner on stderr; hidden for JSON output
fn spinner(format: OutputFormat, message: &str) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn ctx() -> CommandContext {
        CommandContext {
            config: Config::default(),
            format: OutputFormat::Json,
            cache_enabled: false,
        }
    }

    #[test]
    fn test_single_page_uses_page_size() {
        assert_eq!(query_for_pages(&ctx(), 1).limit, 300);
        assert_eq!(query_for_pages(&ctx(), 0).limit, 300);
    }

    #[test]
    fn test_each_extra_page_loads_more() {
        assert_eq!(query_for_pages(&ctx(), 3).limit, 900);
    }

    #[test]
    fn test_json_spinner_is_hidden() {
        assert!(spinner(OutputFormat::Json, "x").is_hidden());
    }
}
