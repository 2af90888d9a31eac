//! Token scraping from portal wrapper pages
//!
//! The portal renders its form configuration as a JS object literal inside
//! the page, and the CSRF token as a meta tag. Neither is a stable API, so
//! every pattern lives here.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static FORMREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\\?["']formref\\?["']\s*:\s*\\?["']([^"'\\]+)"#).expect("valid formref regex")
});

// Attribute order varies between deployments.
static CSRF_NAME_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*name=["']_?csrf[_-]?token["'][^>]*content=["']([^"']+)["']"#)
        .expect("valid csrf regex")
});

static CSRF_CONTENT_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*content=["']([^"']+)["'][^>]*name=["']_?csrf[_-]?token["']"#)
        .expect("valid csrf regex")
});

/// Case id from the wrapper URL's `caseid` query parameter
pub fn case_id(wrapper: &Url) -> Option<String> {
    wrapper
        .query_pairs()
        .find(|(k, _)| k.eq_ignore_ascii_case("caseid"))
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Form reference token embedded in the page markup
pub fn form_ref(html: &str) -> Option<String> {
    FORMREF_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// CSRF token from a `<meta>` tag, if the deployment renders one
pub fn csrf_token(html: &str) -> Option<String> {
    CSRF_NAME_FIRST_RE
        .captures(html)
        .or_else(|| CSRF_CONTENT_FIRST_RE.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
