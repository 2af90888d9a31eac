//! Display models for CLI output
//!
//! Converts report items and classifications into table rows and text
//! cards. JSON output serializes the underlying types directly.

pub mod display;

pub use display::{ClassifyDisplay, ReportDisplay, format_cards};
