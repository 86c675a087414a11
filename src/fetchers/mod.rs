//! Page fetcher implementations

pub mod browser;
pub mod http;

use std::future::Future;

use clap::ValueEnum;
use tracing::warn;

use crate::config::CrawlConfig;
use crate::error::Result;
use crate::traits::PageFetcher;

pub use browser::BrowserSession;
pub use http::HttpFetcher;

/// How pages are loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FetchEngine {
    /// Headless Chromium, waits for markers after JavaScript runs
    #[default]
    Browser,
    /// Plain HTTP GET, markers must be present in the served markup
    Http,
}

/// Start the session every page of the run is loaded through.
///
/// # Errors
/// `CrawlError::SessionStartFailure` when the session cannot be created.
pub async fn open_session(
    engine: FetchEngine,
    config: &CrawlConfig,
) -> Result<Box<dyn PageFetcher>> {
    Ok(match engine {
        FetchEngine::Browser => {
            Box::new(BrowserSession::launch(&config.browser, config.page_timeout).await?)
        }
        FetchEngine::Http => Box::new(HttpFetcher::new(
            &config.browser.user_agent,
            config.page_timeout,
        )?),
    })
}

/// [`open_session`], abandoned as soon as `cancel` resolves.
///
/// Returns `Ok(None)` when cancelled; a half-started session is dropped.
pub async fn open_session_until(
    engine: FetchEngine,
    config: &CrawlConfig,
    cancel: impl Future<Output = ()>,
) -> Result<Option<Box<dyn PageFetcher>>> {
    tokio::select! {
        biased;
        _ = cancel => {
            warn!("Session start interrupted");
            Ok(None)
        }
        session = open_session(engine, config) => session.map(Some),
    }
}
