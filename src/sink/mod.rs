//! CSV persistence for crawled product records

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::{CrawlError, Result};
use crate::models::{ColumnSchema, ProductRecord};

/// Writes `records` to `destination` as UTF-8 CSV: one header row from
/// `schema`, then one row per record in collection order.
///
/// The records are only borrowed, so a failed write can be retried against
/// another destination.
///
/// # Errors
/// `CrawlError::IoFailure` when the file cannot be created or written.
pub fn write_records(
    records: &[ProductRecord],
    schema: &ColumnSchema,
    destination: &Path,
) -> Result<()> {
    let io_failure = |source: std::io::Error| CrawlError::IoFailure {
        path: destination.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(destination).map_err(|e| io_failure(e.into()))?;

    writer
        .write_record(schema.header())
        .map_err(|e| io_failure(e.into()))?;
    for record in records {
        writer
            .write_record(record.row(schema))
            .map_err(|e| io_failure(e.into()))?;
    }
    writer.flush().map_err(io_failure)?;

    info!(
        "Results saved to file {} ({} records)",
        destination.display(),
        records.len()
    );
    Ok(())
}

/// Writes to `primary`, retrying once against `fallback` when that fails.
/// Returns the path that now holds the records.
///
/// # Errors
/// The primary's `CrawlError::IoFailure` when no fallback is given, otherwise
/// the fallback's.
pub fn write_with_fallback(
    records: &[ProductRecord],
    schema: &ColumnSchema,
    primary: &Path,
    fallback: Option<&Path>,
) -> Result<PathBuf> {
    match write_records(records, schema, primary) {
        Ok(()) => Ok(primary.to_path_buf()),
        Err(e) => {
            error!("{}", e);
            let Some(fallback) = fallback else {
                return Err(e);
            };
            warn!("Retrying write to {}", fallback.display());
            write_records(records, schema, fallback)?;
            Ok(fallback.to_path_buf())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeSet, ProductDetails};

    fn record(name: &str) -> ProductRecord {
        let mut attributes = AttributeSet::default();
        attributes.insert("Brand", "Acme, Inc.");
        ProductRecord::from_details(ProductDetails {
            name: name.to_string(),
            description: "Line one\nline two".to_string(),
            price: "$5".to_string(),
            product_url: format!("https://shop.test/listings/{name}"),
            attributes,
            ..ProductDetails::default()
        })
    }

    #[test]
    fn writes_header_and_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let records = vec![record("first"), record("second")];

        write_records(&records, &ColumnSchema::english(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 8);
        assert_eq!(&headers[0], "Name");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "first");
        assert_eq!(&rows[1][0], "second");
        assert_eq!(&rows[0][1], "Line one\nline two");
        assert_eq!(&rows[0][7], "Brand: Acme, Inc.");
        assert_eq!(&rows[0][5], records[0].unique_key.to_string());
    }

    #[test]
    fn empty_collection_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        write_records(&[], &ColumnSchema::ukrainian(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.starts_with("Назва,Опис,Ціна"));
    }

    #[test]
    fn unwritable_destination_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let records = vec![record("kept")];

        let err = write_records(&records, &ColumnSchema::english(), &path).unwrap_err();

        assert!(matches!(err, CrawlError::IoFailure { .. }));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn failed_primary_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("missing").join("out.csv");
        let fallback = dir.path().join("fallback.csv");
        let records = vec![record("saved")];

        let written =
            write_with_fallback(&records, &ColumnSchema::english(), &primary, Some(&fallback))
                .unwrap();

        assert_eq!(written, fallback);
        assert!(!primary.exists());
        let contents = std::fs::read_to_string(&fallback).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("saved"));
    }

    #[test]
    fn failed_primary_without_fallback_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("missing").join("out.csv");

        let err = write_with_fallback(&[record("lost")], &ColumnSchema::english(), &primary, None)
            .unwrap_err();

        assert!(matches!(err, CrawlError::IoFailure { ref path, .. } if path == &primary));
    }

    #[test]
    fn writable_primary_ignores_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("out.csv");
        let fallback = dir.path().join("fallback.csv");

        let written =
            write_with_fallback(&[], &ColumnSchema::english(), &primary, Some(&fallback)).unwrap();

        assert_eq!(written, primary);
        assert!(!fallback.exists());
    }
}
