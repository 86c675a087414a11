//! Chromium-backed page fetcher

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::error::Elapsed;
use tracing::{debug, error, info, trace, warn};

use crate::config::BrowserOptions;
use crate::error::{CrawlError, Result};
use crate::traits::{PageFetcher, ReadinessMarker};

const MARKER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One Chromium instance with a single tab that every load navigates.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    timeout: Duration,
}

impl BrowserSession {
    /// Launch Chromium with the configured flags and open the working tab.
    ///
    /// # Errors
    /// `CrawlError::SessionStartFailure` if the browser cannot be configured,
    /// launched, or cannot open a tab.
    pub async fn launch(options: &BrowserOptions, timeout: Duration) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(timeout)
            .window_size(1920, 1080)
            .arg(format!("--user-agent={}", options.user_agent))
            .args(options.args.iter().map(String::as_str));

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(CrawlError::SessionStartFailure)?;

        info!("Launching browser (headless: {})", options.headless);
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::SessionStartFailure(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let message = e.to_string();
                    // chromiumoxide does not know every CDP event Chrome emits
                    if message.contains("data did not match any variant")
                        || message.contains("Failed to deserialize WS response")
                    {
                        trace!("Ignored CDP message: {}", message);
                    } else {
                        error!("Browser handler error: {}", message);
                    }
                }
            }
            debug!("Browser handler finished");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(CrawlError::SessionStartFailure(format!(
                    "could not open a tab: {e}"
                )));
            }
        };

        Ok(Self {
            browser,
            page,
            handler,
            timeout,
        })
    }

    async fn wait_for_marker(
        &self,
        url: &str,
        marker: &ReadinessMarker,
        deadline: Instant,
    ) -> Result<()> {
        let css = marker.css();
        loop {
            if self.page.find_element(css.as_str()).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CrawlError::PageNotReady {
                    url: url.to_string(),
                    marker: css,
                    timeout: self.timeout,
                });
            }
            tokio::time::sleep(MARKER_POLL_INTERVAL).await;
        }
    }
}

/// Maps a timeout-wrapped `goto` onto the load result.
///
/// An unfinished navigation leaves the previous document in the tab, and that
/// document may already carry the marker, so it counts as not ready.
fn navigation_outcome<T, E: std::fmt::Display>(
    navigation: std::result::Result<std::result::Result<T, E>, Elapsed>,
    url: &str,
    marker: &ReadinessMarker,
    timeout: Duration,
) -> Result<()> {
    match navigation {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(CrawlError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => {
            warn!("Navigation to {} did not finish within {:?}", url, timeout);
            Err(CrawlError::PageNotReady {
                url: url.to_string(),
                marker: marker.css(),
                timeout,
            })
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserSession {
    async fn load(&mut self, url: &str, marker: &ReadinessMarker) -> Result<String> {
        debug!("Navigating to {}", url);
        let deadline = Instant::now() + self.timeout;

        let navigation = tokio::time::timeout(self.timeout, self.page.goto(url)).await;
        navigation_outcome(navigation, url, marker, self.timeout)?;

        self.wait_for_marker(url, marker, deadline).await?;

        self.page.content().await.map_err(|e| CrawlError::Navigation {
            url: url.to_string(),
            reason: format!("could not read page content: {e}"),
        })
    }

    async fn close(&mut self) -> Result<()> {
        info!("Closing browser session");
        if let Err(e) = self.browser.close().await {
            warn!("Browser did not close cleanly: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn elapsed() -> Elapsed {
        tokio::time::timeout(Duration::ZERO, std::future::pending::<()>())
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn unfinished_navigation_is_not_ready() {
        let marker = ReadinessMarker::tag("body");
        let outcome = navigation_outcome::<(), String>(
            Err(elapsed().await),
            "https://shop.test/l/2",
            &marker,
            Duration::from_secs(20),
        );

        assert!(matches!(
            outcome,
            Err(CrawlError::PageNotReady { ref url, .. }) if url == "https://shop.test/l/2"
        ));
    }

    #[test]
    fn navigation_errors_and_success() {
        let marker = ReadinessMarker::id("main_right");
        let timeout = Duration::from_secs(1);

        assert!(navigation_outcome::<(), String>(Ok(Ok(())), "https://shop.test", &marker, timeout).is_ok());
        assert!(matches!(
            navigation_outcome::<(), String>(
                Ok(Err("net::ERR_NAME_NOT_RESOLVED".to_string())),
                "https://shop.test",
                &marker,
                timeout,
            ),
            Err(CrawlError::Navigation { .. })
        ));
    }
}
