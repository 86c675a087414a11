//! Crawl configuration: defaults, validation and delay sampling

use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;

use crate::error::{CrawlError, Result};
use crate::models::ColumnSchema;
use crate::traits::SiteSelectors;

pub const DEFAULT_BASE_URL: &str = "https://www.bonanza.com";
pub const DEFAULT_CATEGORY_LIMIT: usize = 3;
pub const DEFAULT_PRODUCT_LIMIT: usize = 5;
pub const DEFAULT_OUTPUT_FILE: &str = "out.csv";
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_DELAY_MIN_SECS: f64 = 2.0;
pub const DEFAULT_DELAY_MAX_SECS: f64 = 3.0;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/111.0.0.0 Safari/537.36";

pub const BROWSER_ARGS: [&str; 3] = [
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
];

/// Uniform random pause applied between page loads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(CrawlError::Config(format!(
                "delay minimum {min:?} exceeds maximum {max:?}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn from_secs_f64(min: f64, max: f64) -> Result<Self> {
        let to_duration = |secs: f64| {
            Duration::try_from_secs_f64(secs)
                .map_err(|e| CrawlError::Config(format!("invalid delay {secs}: {e}")))
        };
        Self::new(to_duration(min)?, to_duration(max)?)
    }

    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::rng().random_range(self.min..=self.max)
    }

    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Settings for the browser-backed page fetcher
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub user_agent: String,
    pub args: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            user_agent: USER_AGENT.to_string(),
            args: BROWSER_ARGS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Immutable settings for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: String,
    pub category_limit: usize,
    pub product_limit: usize,
    pub page_timeout: Duration,
    pub delay: DelayRange,
    pub output: PathBuf,
    pub schema: ColumnSchema,
    pub selectors: SiteSelectors,
    pub browser: BrowserOptions,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            category_limit: DEFAULT_CATEGORY_LIMIT,
            product_limit: DEFAULT_PRODUCT_LIMIT,
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
            delay: DelayRange {
                min: Duration::from_secs_f64(DEFAULT_DELAY_MIN_SECS),
                max: Duration::from_secs_f64(DEFAULT_DELAY_MAX_SECS),
            },
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            schema: ColumnSchema::ukrainian(),
            selectors: SiteSelectors::default(),
            browser: BrowserOptions::default(),
        }
    }
}

impl CrawlConfig {
    /// Checks invariants that the type system does not already enforce
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(CrawlError::Config("base URL is empty".to_string()));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(CrawlError::Config(format!(
                "base URL must be http(s): {base}"
            )));
        }
        if self.page_timeout.is_zero() {
            return Err(CrawlError::Config("page timeout must be positive".to_string()));
        }
        if self.schema.len() != 8 {
            return Err(CrawlError::Config(format!(
                "column schema must have 8 columns, got {}",
                self.schema.len()
            )));
        }
        Ok(())
    }

    /// Base URL without a trailing slash, ready for joining with site paths
    pub fn base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CrawlConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.category_limit, 3);
        assert_eq!(config.product_limit, 5);
        assert_eq!(config.schema, ColumnSchema::ukrainian());
    }

    #[test]
    fn inverted_delay_is_rejected() {
        assert!(matches!(
            DelayRange::from_secs_f64(3.0, 2.0),
            Err(CrawlError::Config(_))
        ));
        assert!(DelayRange::from_secs_f64(-1.0, 2.0).is_err());
    }

    #[test]
    fn samples_stay_within_range() {
        let range = DelayRange::from_secs_f64(0.5, 0.75).unwrap();

        for _ in 0..100 {
            let d = range.sample();
            assert!(d >= range.min() && d <= range.max());
        }
        assert_eq!(DelayRange::none().sample(), Duration::ZERO);
    }

    #[test]
    fn base_url_must_be_http() {
        let config = CrawlConfig {
            base_url: "ftp://example.com".to_string(),
            ..CrawlConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = CrawlConfig {
            base_url: "https://shop.test/".to_string(),
            ..CrawlConfig::default()
        };

        assert_eq!(config.base(), "https://shop.test");
    }
}
