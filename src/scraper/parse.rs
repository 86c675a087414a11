//! Extraction rules for the marketplace's category, search and listing pages.
//!
//! Everything here works on already-fetched markup, so each rule can be
//! exercised against static fixtures without a browser.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::query::{absolutize, attr, find_all_in, find_first, find_in, joined_text, selector, text};
use crate::error::{CrawlError, Result};
use crate::models::{AttributeSet, CategoryRef, ProductDetails, ProductRef};
use crate::traits::SiteSelectors;

const DESCRIPTION_START: &str = "Item Description";
const DESCRIPTION_END: &str = "About Us";

/// Traits table rows (0-based) that carry the attributes worth keeping
const TRAIT_ROWS: std::ops::Range<usize> = 3..5;

/// [`SiteSelectors`] parsed once up front
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    category_group: Selector,
    category_group_mid: Selector,
    linked_anchor: Selector,
    anchor: Selector,
    results_container: Selector,
    result_item: Selector,
    main_image: Selector,
    image_trigger: Selector,
    basic_info: Selector,
    span: Selector,
    item_price: Selector,
    description: Selector,
    traits: Selector,
    trait_label: Selector,
    trait_value: Selector,
    listing_details: Selector,
    table: Selector,
    tbody: Selector,
    row: Selector,
    cell: Selector,
}

impl CompiledSelectors {
    pub fn compile(site: &SiteSelectors) -> Result<Self> {
        Ok(Self {
            category_group: selector(&site.category_group)?,
            category_group_mid: selector(&site.category_group_mid)?,
            linked_anchor: selector("a[href]")?,
            anchor: selector("a")?,
            results_container: selector(&site.results_container)?,
            result_item: selector(&site.result_item)?,
            main_image: selector(&site.main_image)?,
            image_trigger: selector(&site.image_trigger)?,
            basic_info: selector(&site.basic_info)?,
            span: selector("span")?,
            item_price: selector(&site.item_price)?,
            description: selector(&site.description)?,
            traits: selector(&site.traits)?,
            trait_label: selector(&site.trait_label)?,
            trait_value: selector(&site.trait_value)?,
            listing_details: selector(&site.listing_details)?,
            table: selector("table")?,
            tbody: selector("tbody")?,
            row: selector("tr")?,
            cell: selector("td")?,
        })
    }

    /// Rows of the first table body inside `container`
    fn table_rows<'a>(&self, container: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        find_in(container, &self.table)
            .and_then(|table| find_in(table, &self.tbody))
            .map(|tbody| find_all_in(tbody, &self.row))
            .unwrap_or_default()
    }
}

/// Category links from the categories-browse page, in document order.
///
/// # Errors
/// `CrawlError::StructureMismatch` when the page has no category groups at all.
pub fn parse_categories(
    html: &str,
    page_url: &str,
    base_url: &str,
    limit: usize,
    sel: &CompiledSelectors,
) -> Result<Vec<CategoryRef>> {
    let document = Html::parse_document(html);

    let groups: Vec<_> = document.select(&sel.category_group).collect();
    if groups.is_empty() {
        return Err(CrawlError::StructureMismatch {
            url: page_url.to_string(),
            expected: "category group containers",
        });
    }

    let links: Vec<CategoryRef> = groups
        .into_iter()
        .filter_map(|group| find_in(group, &sel.category_group_mid))
        .filter_map(|mid| find_in(mid, &sel.linked_anchor))
        .filter_map(|a| attr(a, "href"))
        .filter(|href| !href.trim().is_empty())
        .map(|href| CategoryRef(absolutize(base_url, &href)))
        .collect();

    debug!("Categories found: {}", links.len());
    Ok(links.into_iter().take(limit).collect())
}

/// Product links from the first results page of a category.
///
/// At most `limit` result items are inspected; an item without a linked
/// anchor still counts towards the limit.
///
/// # Errors
/// `CrawlError::StructureMismatch` when the results container is missing.
pub fn parse_product_links(
    html: &str,
    category_url: &str,
    base_url: &str,
    limit: usize,
    sel: &CompiledSelectors,
) -> Result<Vec<ProductRef>> {
    let document = Html::parse_document(html);

    let container = find_first(&document, &sel.results_container).ok_or_else(|| {
        CrawlError::StructureMismatch {
            url: category_url.to_string(),
            expected: "search results container",
        }
    })?;

    let items: Vec<_> = container.select(&sel.result_item).take(limit).collect();
    debug!(
        "Found items in category (limited to {}): {}",
        limit,
        items.len()
    );

    Ok(items
        .into_iter()
        .filter_map(|item| find_in(item, &sel.anchor))
        .filter_map(|a| attr(a, "href"))
        .filter(|href| !href.trim().is_empty())
        .map(|href| ProductRef(absolutize(base_url, &href)))
        .collect())
}

/// Every field of a listing page. Missing elements leave their field empty.
pub fn parse_product_details(
    html: &str,
    product_url: &str,
    sel: &CompiledSelectors,
) -> ProductDetails {
    let document = Html::parse_document(html);

    let image_url = find_first(&document, &sel.main_image)
        .and_then(|c| find_in(c, &sel.image_trigger))
        .and_then(|a| attr(a, "href"))
        .unwrap_or_default();

    let basic_info = find_first(&document, &sel.basic_info);
    let name = basic_info
        .and_then(|info| find_in(info, &sel.span))
        .map(text)
        .unwrap_or_default();
    let price = basic_info
        .and_then(|info| find_in(info, &sel.item_price))
        .map(text)
        .unwrap_or_default();

    let description = find_first(&document, &sel.description)
        .map(|d| extract_description(&joined_text(d, " ")))
        .unwrap_or_default();

    let attributes = find_first(&document, &sel.traits)
        .map(|traits| {
            let rows = sel.table_rows(traits);
            let attributes = parse_traits(&rows, sel);
            if rows.len() < TRAIT_ROWS.end {
                warn!(
                    "Not enough rows in the characteristics table ({}) on {}",
                    rows.len(),
                    product_url
                );
            }
            attributes
        })
        .unwrap_or_default();

    let item_code = find_first(&document, &sel.listing_details)
        .and_then(|details| sel.table_rows(details).pop())
        .and_then(|last_row| find_all_in(last_row, &sel.cell).pop())
        .map(text)
        .unwrap_or_default();

    ProductDetails {
        name,
        description,
        price,
        image_url,
        product_url: product_url.to_string(),
        item_code,
        attributes,
    }
}

/// Narrows a description block to the text between its "Item Description"
/// and "About Us" headings, or returns it whole if either is absent.
pub fn extract_description(full_text: &str) -> String {
    match (
        full_text.find(DESCRIPTION_START),
        full_text.find(DESCRIPTION_END),
    ) {
        (Some(start), Some(end)) => {
            let start = start + DESCRIPTION_START.len();
            full_text
                .get(start..end)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        }
        _ => full_text.to_string(),
    }
}

fn parse_traits(rows: &[ElementRef<'_>], sel: &CompiledSelectors) -> AttributeSet {
    let mut attributes = AttributeSet::default();
    if rows.len() < TRAIT_ROWS.end {
        return attributes;
    }

    for row in &rows[TRAIT_ROWS] {
        let label = find_in(*row, &sel.trait_label);
        let value = find_in(*row, &sel.trait_value);
        if let (Some(label), Some(value)) = (label, value) {
            let key = text(label).trim_end_matches(':').to_string();
            attributes.insert(key, text(value));
        }
    }
    attributes
}
