use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use market_crawler::config::{self, BrowserOptions, CrawlConfig, DelayRange};
use market_crawler::fetchers::{self, FetchEngine};
use market_crawler::models::ColumnSchema;
use market_crawler::{Crawler, sink};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaChoice {
    En,
    Ua,
}

/// Crawl marketplace categories and export product listings to CSV
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[arg(long, env = "MARKET_CRAWLER_BASE_URL", default_value = config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Maximum number of categories to process
    #[arg(long, env = "MARKET_CRAWLER_CATEGORIES", default_value_t = config::DEFAULT_CATEGORY_LIMIT)]
    categories: usize,

    /// Maximum number of products per category
    #[arg(long, env = "MARKET_CRAWLER_PRODUCTS", default_value_t = config::DEFAULT_PRODUCT_LIMIT)]
    products: usize,

    /// Seconds to wait for a page's readiness marker
    #[arg(long, env = "MARKET_CRAWLER_TIMEOUT", default_value_t = config::DEFAULT_PAGE_TIMEOUT_SECS)]
    timeout: u64,

    #[arg(long, env = "MARKET_CRAWLER_DELAY_MIN", default_value_t = config::DEFAULT_DELAY_MIN_SECS)]
    delay_min: f64,

    #[arg(long, env = "MARKET_CRAWLER_DELAY_MAX", default_value_t = config::DEFAULT_DELAY_MAX_SECS)]
    delay_max: f64,

    #[arg(short, long, env = "MARKET_CRAWLER_OUTPUT", default_value = config::DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Second destination tried when the output file cannot be written
    #[arg(long, env = "MARKET_CRAWLER_FALLBACK_OUTPUT")]
    fallback_output: Option<PathBuf>,

    /// Column header language
    #[arg(long, env = "MARKET_CRAWLER_SCHEMA", value_enum, default_value_t = SchemaChoice::Ua)]
    schema: SchemaChoice,

    #[arg(long, env = "MARKET_CRAWLER_ENGINE", value_enum, default_value_t = FetchEngine::Browser)]
    engine: FetchEngine,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    #[arg(long, env = "CHROME")]
    chrome_path: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<(CrawlConfig, FetchEngine, Option<PathBuf>)> {
        let delay = DelayRange::from_secs_f64(self.delay_min, self.delay_max)?;
        let schema = match self.schema {
            SchemaChoice::En => ColumnSchema::english(),
            SchemaChoice::Ua => ColumnSchema::ukrainian(),
        };

        let config = CrawlConfig {
            base_url: self.base_url,
            category_limit: self.categories,
            product_limit: self.products,
            page_timeout: Duration::from_secs(self.timeout),
            delay,
            output: self.output,
            schema,
            browser: BrowserOptions {
                headless: !self.headful,
                chrome_executable: self.chrome_path,
                ..BrowserOptions::default()
            },
            ..CrawlConfig::default()
        };
        config.validate()?;

        Ok((config, self.engine, self.fallback_output))
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (config, engine, fallback) = Cli::parse().into_config()?;

    info!(
        "Starting marketplace crawl of {} ({} categories x {} products)",
        config.base_url, config.category_limit, config.product_limit
    );

    let Some(session) = fetchers::open_session_until(engine, &config, interrupted())
        .await
        .context("Could not start page session")?
    else {
        bail!("Interrupted before the crawl started");
    };
    let mut crawler = Crawler::new(&config, session)?;

    let cancelled = tokio::select! {
        _ = crawler.run() => false,
        _ = interrupted() => true,
    };
    if cancelled {
        warn!("Interrupted, saving the records collected so far");
        crawler.cancel();
    }

    // Further Ctrl-C presses are ignored until the records are on disk
    let (records, report) = crawler.shutdown().await;
    info!(
        "Crawl finished in {}s: {} categories ({} skipped), {} of {} products extracted",
        report.elapsed_secs(),
        report.categories_found,
        report.categories_skipped,
        report.products_extracted,
        report.products_attempted
    );
    match report.to_json() {
        Ok(summary) => info!(target: "market_crawler::report", "{}", summary),
        Err(e) => warn!("Could not serialize crawl report: {}", e),
    }

    sink::write_with_fallback(
        &records,
        &config.schema,
        &config.output,
        fallback.as_deref(),
    )
    .context("Could not save crawl results")?;

    Ok(())
}
