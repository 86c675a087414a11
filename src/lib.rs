//! Marketplace crawler: walks category pages, follows product listings and
//! writes one CSV row per extracted product.

pub mod config;
pub mod crawler;
pub mod error;
pub mod fetchers;
pub mod models;
pub mod scraper;
pub mod sink;
pub mod traits;

pub use config::CrawlConfig;
pub use crawler::Crawler;
pub use error::CrawlError;
pub use models::{ColumnSchema, ProductRecord};
