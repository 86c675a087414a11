//! Small query layer over `scraper` used by the extraction rules

use scraper::{ElementRef, Html, Selector};

use crate::error::{CrawlError, Result};

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CrawlError::InvalidSelector {
        selector: css.to_string(),
        reason: format!("{e:?}"),
    })
}

pub fn find_first<'a>(document: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    document.select(selector).next()
}

pub fn find_in<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

pub fn find_all_in<'a>(element: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    element.select(selector).collect()
}

/// Whitespace-stripped text fragments concatenated with no separator
pub fn text(element: ElementRef<'_>) -> String {
    joined_text(element, "")
}

/// Whitespace-stripped, non-empty text fragments joined by `separator`
pub fn joined_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

pub fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(ToString::to_string)
}

/// Makes a site-relative href absolute against `base_url`
pub fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{base_url}{href}")
    }
}
