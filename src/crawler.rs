use tracing::{info, warn};

use crate::config::CrawlConfig;
use crate::error::{CrawlError, Result};
use crate::models::{CrawlReport, ProductRecord};
use crate::scraper::MarketScraper;
use crate::traits::PageFetcher;

/// Drives categories → product links → product details through one session.
///
/// Records accumulate inside the crawler, so dropping a [`Crawler::run`]
/// future part-way (cancellation) keeps everything extracted so far.
pub struct Crawler<F: PageFetcher> {
    fetcher: F,
    scraper: MarketScraper,
    category_limit: usize,
    product_limit: usize,
    records: Vec<ProductRecord>,
    report: CrawlReport,
}

impl<F: PageFetcher> Crawler<F> {
    pub fn new(config: &CrawlConfig, fetcher: F) -> Result<Self> {
        Ok(Self {
            fetcher,
            scraper: MarketScraper::new(config)?,
            category_limit: config.category_limit,
            product_limit: config.product_limit,
            records: Vec::new(),
            report: CrawlReport::start(),
        })
    }

    pub async fn run(&mut self) -> &CrawlReport {
        self.records.clear();
        self.report = CrawlReport::start();

        let categories = match self
            .scraper
            .discover_categories(&mut self.fetcher, self.category_limit)
            .await
        {
            Ok(categories) => categories,
            Err(e) => {
                skip_warning("category index", &e);
                Vec::new()
            }
        };
        self.report.categories_found = categories.len();
        info!("Processing {} categories", categories.len());

        for (cat_idx, category) in categories.iter().enumerate() {
            let cat_idx = cat_idx + 1;
            info!("[Category {}] Going to category: {}", cat_idx, category);

            let links = match self
                .scraper
                .discover_product_links(&mut self.fetcher, category, self.product_limit)
                .await
            {
                Ok(links) => links,
                Err(e) => {
                    skip_warning("category", &e);
                    self.report.categories_skipped += 1;
                    continue;
                }
            };
            if links.is_empty() {
                warn!("[Category {}] No product links found", cat_idx);
            }

            for (prod_idx, link) in links.iter().enumerate() {
                info!(
                    "[Category {} - Product {}] Processing product: {}",
                    cat_idx,
                    prod_idx + 1,
                    link
                );
                self.report.products_attempted += 1;

                match self.scraper.extract_details(&mut self.fetcher, link).await {
                    Ok(record) => {
                        self.records.push(record);
                        self.report.products_extracted += 1;
                    }
                    Err(e) => {
                        skip_warning("product", &e);
                        self.report.products_skipped += 1;
                    }
                }
            }
        }

        self.report.finish();
        &self.report
    }

    /// Marks the run as cancelled; collected records are left untouched
    pub fn cancel(&mut self) {
        self.report.cancelled = true;
        self.report.finish();
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn report(&self) -> &CrawlReport {
        &self.report
    }

    /// Close the session and hand back everything collected
    pub async fn shutdown(mut self) -> (Vec<ProductRecord>, CrawlReport) {
        if let Err(e) = self.fetcher.close().await {
            warn!("Failed to close page session: {}", e);
        }
        (self.records, self.report)
    }
}

fn skip_warning(unit: &str, error: &CrawlError) {
    match error {
        CrawlError::StructureMismatch { .. } => warn!("Skipping {unit}, layout changed? {error}"),
        _ => warn!("Skipping {unit}: {error}"),
    }
}
