//! The three pipeline stages: load a page, pause, then parse it

pub mod parse;
pub mod query;

use tracing::info;

use crate::config::{CrawlConfig, DelayRange};
use crate::error::Result;
use crate::models::{CategoryRef, ProductRecord, ProductRef};
use crate::traits::{PageFetcher, SiteSelectors};
use parse::CompiledSelectors;

/// Marketplace-specific discovery and extraction, driven through a borrowed
/// [`PageFetcher`] so the caller stays the sole owner of the session.
pub struct MarketScraper {
    base_url: String,
    delay: DelayRange,
    site: SiteSelectors,
    selectors: CompiledSelectors,
}

impl MarketScraper {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base().to_string(),
            delay: config.delay,
            selectors: CompiledSelectors::compile(&config.selectors)?,
            site: config.selectors.clone(),
        })
    }

    pub fn categories_url(&self) -> String {
        format!("{}{}", self.base_url, self.site.categories_path)
    }

    /// Up to `limit` category links from the categories-browse page
    pub async fn discover_categories<F>(
        &self,
        fetcher: &mut F,
        limit: usize,
    ) -> Result<Vec<CategoryRef>>
    where
        F: PageFetcher + ?Sized,
    {
        let url = self.categories_url();
        info!("Loading category index {}", url);

        let html = fetcher.load(&url, &self.site.categories_ready).await?;
        parse::parse_categories(&html, &url, &self.base_url, limit, &self.selectors)
    }

    /// Up to `limit` product links from the first results page of `category`
    pub async fn discover_product_links<F>(
        &self,
        fetcher: &mut F,
        category: &CategoryRef,
        limit: usize,
    ) -> Result<Vec<ProductRef>>
    where
        F: PageFetcher + ?Sized,
    {
        let html = fetcher
            .load(category.as_str(), &self.site.category_ready)
            .await?;
        self.delay.pause().await;

        parse::parse_product_links(
            &html,
            category.as_str(),
            &self.base_url,
            limit,
            &self.selectors,
        )
    }

    /// Full record for one listing page, with a freshly generated key
    pub async fn extract_details<F>(
        &self,
        fetcher: &mut F,
        product: &ProductRef,
    ) -> Result<ProductRecord>
    where
        F: PageFetcher + ?Sized,
    {
        let html = fetcher
            .load(product.as_str(), &self.site.product_ready)
            .await?;
        self.delay.pause().await;

        let details = parse::parse_product_details(&html, product.as_str(), &self.selectors);
        Ok(ProductRecord::from_details(details))
    }
}
