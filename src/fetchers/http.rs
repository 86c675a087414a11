//! Plain HTTP page fetcher for sites or mirrors that render without JavaScript

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;

use crate::error::{CrawlError, Result};
use crate::traits::{PageFetcher, ReadinessMarker};

pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| CrawlError::SessionStartFailure(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    fn not_ready(&self, url: &str, marker: &ReadinessMarker) -> CrawlError {
        CrawlError::PageNotReady {
            url: url.to_string(),
            marker: marker.css(),
            timeout: self.timeout,
        }
    }
}

/// Static markup never changes after download, so one check is final.
///
/// Id markers absent from the raw text are rejected without building a DOM.
/// Tags cannot be pre-screened that way since the parser synthesizes `body`.
fn has_marker(html: &str, marker: &ReadinessMarker) -> bool {
    if let ReadinessMarker::ElementId(id) = marker {
        if !html.contains(id.as_str()) {
            return false;
        }
    }
    let Ok(selector) = Selector::parse(&marker.css()) else {
        return false;
    };
    Html::parse_document(html).select(&selector).next().is_some()
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn load(&mut self, url: &str, marker: &ReadinessMarker) -> Result<String> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                self.not_ready(url, marker)
            } else {
                CrawlError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let html = response.text().await.map_err(|e| CrawlError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if has_marker(&html, marker) {
            Ok(html)
        } else {
            Err(self.not_ready(url, marker))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("TestBot/1.0", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn marker_detection() {
        let html = "<html><body><div id=\"main_right\"></div></body></html>";

        assert!(has_marker(html, &ReadinessMarker::id("main_right")));
        assert!(!has_marker(html, &ReadinessMarker::id("search_pages_container")));
        assert!(has_marker(html, &ReadinessMarker::tag("body")));
    }

    #[test]
    fn id_text_outside_an_id_attribute_is_not_a_marker() {
        let html = "<html><body><p class=\"main_right\">main_right</p></body></html>";

        assert!(!has_marker(html, &ReadinessMarker::id("main_right")));
        assert!(!has_marker("<p>plain</p>", &ReadinessMarker::id("main_right")));
        assert!(has_marker("<p>plain</p>", &ReadinessMarker::tag("body")));
    }

    #[tokio::test]
    async fn returns_markup_when_marker_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ready"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><div id=\"main_right\">ok</div></body></html>"),
            )
            .mount(&server)
            .await;

        let html = fetcher()
            .load(&format!("{}/ready", server.uri()), &ReadinessMarker::id("main_right"))
            .await
            .unwrap();

        assert!(html.contains("main_right"));
    }

    #[tokio::test]
    async fn missing_marker_is_page_not_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .mount(&server)
            .await;

        let err = fetcher()
            .load(&format!("{}/empty", server.uri()), &ReadinessMarker::id("main_right"))
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::PageNotReady { .. }));
    }

    #[tokio::test]
    async fn error_status_is_navigation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher()
            .load(&format!("{}/down", server.uri()), &ReadinessMarker::tag("body"))
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::Navigation { .. }));
    }
}
