//! Data models for crawled marketplace listings and run bookkeeping

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Absolute URL of a category listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef(pub String);

/// Absolute URL of a product detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef(pub String);

impl CategoryRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ProductRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Label/value pairs scraped from a listing's traits table, in row order.
///
/// Re-inserting an existing label replaces its value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    entries: Vec<(String, String)>,
}

impl AttributeSet {
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(l, _)| *l == label) {
            entry.1 = value;
        } else {
            self.entries.push((label, value));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// Flattens into `"label: value"` entries joined by `"; "`
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Everything parsed from one product page, before an identifier is assigned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDetails {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub product_url: String,
    pub item_code: String,
    pub attributes: AttributeSet,
}

/// One output row: a crawled product listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub product_url: String,
    pub unique_key: Uuid,
    pub item_code: String,
    pub characteristics: String,
}

impl ProductRecord {
    /// Builds a record with a freshly generated identifier
    pub fn from_details(details: ProductDetails) -> Self {
        Self::with_key(details, Uuid::new_v4())
    }

    pub fn with_key(details: ProductDetails, unique_key: Uuid) -> Self {
        let characteristics = details.attributes.summary();
        Self {
            name: details.name,
            description: details.description,
            price: details.price,
            image_url: details.image_url,
            product_url: details.product_url,
            unique_key,
            item_code: details.item_code,
            characteristics,
        }
    }

    pub fn field(&self, field: Field) -> String {
        match field {
            Field::Name => self.name.clone(),
            Field::Description => self.description.clone(),
            Field::Price => self.price.clone(),
            Field::ImageUrl => self.image_url.clone(),
            Field::ProductUrl => self.product_url.clone(),
            Field::UniqueKey => self.unique_key.to_string(),
            Field::ItemCode => self.item_code.clone(),
            Field::Characteristics => self.characteristics.clone(),
        }
    }

    /// Values in the column order of `schema`
    pub fn row(&self, schema: &ColumnSchema) -> Vec<String> {
        schema.columns().iter().map(|c| self.field(c.field)).collect()
    }
}

/// The eight record fields every column schema maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Description,
    Price,
    ImageUrl,
    ProductUrl,
    UniqueKey,
    ItemCode,
    Characteristics,
}

impl Field {
    pub const ALL: [Self; 8] = [
        Self::Name,
        Self::Description,
        Self::Price,
        Self::ImageUrl,
        Self::ProductUrl,
        Self::UniqueKey,
        Self::ItemCode,
        Self::Characteristics,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub field: Field,
    pub name: String,
}

/// Ordered output columns and their header names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    const ENGLISH: [&'static str; 8] = [
        "Name",
        "Description",
        "Price",
        "Product Image",
        "Product Link",
        "Unique Key",
        "Bonanza Item Code",
        "Characteristics",
    ];

    const UKRAINIAN: [&'static str; 8] = [
        "Назва",
        "Опис",
        "Ціна",
        "Фото товару",
        "Посилання на товар",
        "Унікальний ключ",
        "Код товару з Bonanza",
        "Характеристики",
    ];

    pub fn english() -> Self {
        Self::from_names(Self::ENGLISH)
    }

    pub fn ukrainian() -> Self {
        Self::from_names(Self::UKRAINIAN)
    }

    fn from_names(names: [&str; 8]) -> Self {
        let columns = Field::ALL
            .into_iter()
            .zip(names)
            .map(|(field, name)| Column {
                field,
                name: name.to_string(),
            })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Counters collected over one crawl, logged when the run ends
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub categories_found: usize,
    pub categories_skipped: usize,
    pub products_attempted: usize,
    pub products_extracted: usize,
    pub products_skipped: usize,
    pub cancelled: bool,
}

impl CrawlReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            categories_found: 0,
            categories_skipped: 0,
            products_attempted: 0,
            products_extracted: 0,
            products_skipped: 0,
            cancelled: false,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Whole seconds between start and finish, zero while still running
    pub fn elapsed_secs(&self) -> i64 {
        self.finished_at
            .map(|end| (end - self.started_at).num_seconds())
            .unwrap_or_default()
    }

    /// Single-line JSON form for machine-readable run summaries
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> ProductDetails {
        let mut attributes = AttributeSet::default();
        attributes.insert("Brand", "Acme");
        attributes.insert("Color", "Red");
        ProductDetails {
            name: "Lamp".to_string(),
            description: "A lamp".to_string(),
            price: "$10.00".to_string(),
            image_url: "https://img.test/1.jpg".to_string(),
            product_url: "https://shop.test/listings/1".to_string(),
            item_code: "12345".to_string(),
            attributes,
        }
    }

    #[test]
    fn attribute_summary_keeps_insertion_order() {
        let mut attrs = AttributeSet::default();
        attrs.insert("Size", "M");
        attrs.insert("Brand", "Acme");
        attrs.insert("Size", "L");

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.summary(), "Size: L; Brand: Acme");
        assert_eq!(AttributeSet::default().summary(), "");
    }

    #[test]
    fn rows_follow_schema_order() {
        let key = Uuid::new_v4();
        let record = ProductRecord::with_key(details(), key);

        for schema in [ColumnSchema::english(), ColumnSchema::ukrainian()] {
            let row = record.row(&schema);
            assert_eq!(row.len(), schema.len());
            assert_eq!(row[0], "Lamp");
            assert_eq!(row[4], "https://shop.test/listings/1");
            assert_eq!(row[5], key.to_string());
            assert_eq!(row[7], "Brand: Acme; Color: Red");
        }
    }

    #[test]
    fn schemas_share_field_order() {
        let en = ColumnSchema::english();
        let ua = ColumnSchema::ukrainian();

        assert_eq!(en.len(), 8);
        assert_eq!(en.header()[6], "Bonanza Item Code");
        assert_eq!(ua.header()[0], "Назва");
        let en_fields: Vec<_> = en.columns().iter().map(|c| c.field).collect();
        let ua_fields: Vec<_> = ua.columns().iter().map(|c| c.field).collect();
        assert_eq!(en_fields, ua_fields);
    }

    #[test]
    fn fresh_records_get_distinct_keys() {
        let a = ProductRecord::from_details(details());
        let b = ProductRecord::from_details(details());

        assert_ne!(a.unique_key, b.unique_key);
    }

    #[test]
    fn report_serializes_counters() {
        let mut report = CrawlReport::start();
        report.categories_found = 3;
        report.products_extracted = 7;
        report.cancelled = true;
        report.finish();

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["categories_found"], 3);
        assert_eq!(json["products_extracted"], 7);
        assert_eq!(json["cancelled"], true);
        assert!(json["started_at"].is_string());
        assert!(json["finished_at"].is_string());
        assert!(report.elapsed_secs() >= 0);
    }

    #[test]
    fn unfinished_report_has_no_elapsed_time() {
        let report = CrawlReport::start();

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert!(json["finished_at"].is_null());
        assert_eq!(report.elapsed_secs(), 0);
    }
}
