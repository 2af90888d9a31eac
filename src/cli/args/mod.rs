//! Shared CLI argument types

mod common;
mod global;

pub use common::{CacheKind, OutputFormat};
pub use global::GlobalOptions;
