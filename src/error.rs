//! Error kinds surfaced by the crawl pipeline

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while fetching, parsing or persisting marketplace pages.
///
/// Only [`CrawlError::SessionStartFailure`], [`CrawlError::Config`] and
/// [`CrawlError::IoFailure`] are terminal for a run; every other kind is
/// scoped to a single page and the crawler skips that unit of work.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("readiness marker {marker} did not appear within {timeout:?} on {url}")]
    PageNotReady {
        url: String,
        marker: String,
        timeout: Duration,
    },

    #[error("expected {expected} not found on {url}")]
    StructureMismatch { url: String, expected: &'static str },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("failed to write records to {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("browser session could not start: {0}")]
    SessionStartFailure(String),

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CrawlError {
    /// Whether the error only concerns the page being processed.
    pub fn is_page_scoped(&self) -> bool {
        matches!(
            self,
            Self::PageNotReady { .. } | Self::StructureMismatch { .. } | Self::Navigation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
