//! Traits and site layout descriptions for marketplace crawling

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

/// Element whose presence means a page has rendered enough to be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessMarker {
    /// Element with this `id` attribute
    ElementId(String),
    /// First element with this tag name
    Tag(String),
}

impl ReadinessMarker {
    pub fn id(id: impl Into<String>) -> Self {
        Self::ElementId(id.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// CSS selector matching the marker
    pub fn css(&self) -> String {
        match self {
            Self::ElementId(id) => format!("#{id}"),
            Self::Tag(tag) => tag.clone(),
        }
    }
}

impl fmt::Display for ReadinessMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css())
    }
}

/// A single page-loading session.
///
/// Loading a page changes the session's navigation state, so implementations
/// take `&mut self` and at most one load is ever in flight per session.
#[async_trait]
pub trait PageFetcher: Send {
    /// Navigate to `url` and return the rendered markup once `marker` exists.
    ///
    /// # Errors
    /// * `CrawlError::PageNotReady` - the marker did not show up before the timeout
    /// * `CrawlError::Navigation` - the page could not be loaded at all
    async fn load(&mut self, url: &str, marker: &ReadinessMarker) -> Result<String>;

    /// Release the session. Further loads are not expected to succeed.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Box<T> {
    async fn load(&mut self, url: &str, marker: &ReadinessMarker) -> Result<String> {
        (**self).load(url, marker).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

/// CSS selectors for every part of the marketplace the crawler reads
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    /// Path of the categories-browse page, appended to the base URL
    pub categories_path: String,
    pub categories_ready: ReadinessMarker,
    pub category_group: String,
    pub category_group_mid: String,
    pub category_ready: ReadinessMarker,
    pub results_container: String,
    pub result_item: String,
    pub product_ready: ReadinessMarker,
    pub main_image: String,
    pub image_trigger: String,
    pub basic_info: String,
    pub item_price: String,
    pub description: String,
    pub traits: String,
    pub trait_label: String,
    pub trait_value: String,
    pub listing_details: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            categories_path: "/booths/browse_categories".to_string(),
            categories_ready: ReadinessMarker::id("main_right"),
            category_group: "div.category_group_container".to_string(),
            category_group_mid: "div.category_group_container_mid".to_string(),
            category_ready: ReadinessMarker::id("search_pages_container"),
            results_container: "div.search_results_items_container".to_string(),
            result_item: "div.search_result_item".to_string(),
            product_ready: ReadinessMarker::tag("body"),
            main_image: "div.main_image_container".to_string(),
            image_trigger: "a.fancybox_trigger".to_string(),
            basic_info: "div.item_listing_basic_info".to_string(),
            item_price: "div.item_price".to_string(),
            description: "div.item_description_inner".to_string(),
            traits: "div.item_listing_item_traits".to_string(),
            trait_label: "th.extended_info_label".to_string(),
            trait_value: "td.extended_info_value".to_string(),
            listing_details: "div.listing_details_section".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_render_as_css() {
        assert_eq!(ReadinessMarker::id("main_right").css(), "#main_right");
        assert_eq!(ReadinessMarker::tag("body").css(), "body");
    }
}
