//! # CSV Persistence
//!
//! Plain delimited-text serialization of the long and wide tables, the concept
//! lookups, and the per-series last-updated dates. Parent directories are
//! created on demand; writes are not atomic.

use crate::dataset::{DatasetLong, DatasetWide, ObservationKey, WideRow};
use crate::errors::IdsError;
use crate::types::{MetadataEntry, Observation};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

/// Key columns of the wide table, in file order.
pub const WIDE_KEY_COLUMNS: [&str; 5] = [
    "series_short_name",
    "debtor_country_id",
    "debtor_country_name",
    "creditor_id",
    "creditor_name",
];

/// Columns of the long table, in file order.
pub const LONG_COLUMNS: [&str; 7] = [
    "series_short_name",
    "debtor_country_id",
    "debtor_country_name",
    "creditor_id",
    "creditor_name",
    "year",
    "value",
];

/// Columns of a concept lookup file.
pub const METADATA_COLUMNS: [&str; 2] = ["code", "name"];

/// Columns of the last-updated report.
pub const LAST_UPDATED_COLUMNS: [&str; 2] = ["series", "last_updated"];

#[derive(Serialize)]
struct LastUpdatedRow<'a> {
    series: &'a str,
    last_updated: String,
}

fn create_writer(path: &Path) -> Result<csv::Writer<File>, IdsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| IdsError::io(parent, e))?;
        }
    }
    // Headers are always written explicitly so empty tables keep their columns.
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| IdsError::csv(path, e))
}

fn serialize_all<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> Result<usize, IdsError> {
    let mut writer = create_writer(path)?;
    writer
        .write_record(header)
        .map_err(|e| IdsError::csv(path, e))?;
    let mut count = 0;
    for row in rows {
        writer.serialize(row).map_err(|e| IdsError::csv(path, e))?;
        count += 1;
    }
    writer.flush().map_err(|e| IdsError::io(path, e))?;
    Ok(count)
}

/// Writes the long table, one observation per row.
pub fn write_long_csv(dataset: &DatasetLong, path: &Path) -> Result<usize, IdsError> {
    let count = serialize_all(path, &LONG_COLUMNS, dataset.observations())?;
    info!("Wrote {count} observations to '{}'.", path.display());
    Ok(count)
}

/// Reads a long table written by [`write_long_csv`].
pub fn read_long_csv(path: &Path) -> Result<DatasetLong, IdsError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| IdsError::csv(path, e))?;
    let observations = reader
        .deserialize::<Observation>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IdsError::csv(path, e))?;
    Ok(DatasetLong::from_observations(observations))
}

/// Writes the wide table: the key columns followed by one column per year.
/// Years without an observation are left empty.
pub fn write_wide_csv(dataset: &DatasetWide, path: &Path) -> Result<usize, IdsError> {
    let mut writer = create_writer(path)?;

    let header = WIDE_KEY_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(dataset.years().iter().map(|y| y.to_string()));
    writer
        .write_record(header)
        .map_err(|e| IdsError::csv(path, e))?;

    for row in dataset.rows() {
        let key = &row.key;
        let record = [
            key.series_short_name.clone(),
            key.debtor_country_id.clone(),
            key.debtor_country_name.clone(),
            key.creditor_id.clone(),
            key.creditor_name.clone(),
        ]
        .into_iter()
        .chain(
            row.values
                .iter()
                .map(|v| v.map(|n| n.to_string()).unwrap_or_default()),
        );
        writer
            .write_record(record)
            .map_err(|e| IdsError::csv(path, e))?;
    }

    writer.flush().map_err(|e| IdsError::io(path, e))?;
    info!(
        "Wrote {} rows x {} years to '{}'.",
        dataset.rows().len(),
        dataset.years().len(),
        path.display()
    );
    Ok(dataset.rows().len())
}

/// Reads a wide table written by [`write_wide_csv`].
pub fn read_wide_csv(path: &Path) -> Result<DatasetWide, IdsError> {
    let target = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| IdsError::csv(path, e))?;
    let headers = reader.headers().map_err(|e| IdsError::csv(path, e))?.clone();

    let key_len = WIDE_KEY_COLUMNS.len();
    let key_headers: Vec<&str> = headers.iter().take(key_len).collect();
    if key_headers != WIDE_KEY_COLUMNS {
        return Err(IdsError::parse(
            &target,
            format!("expected key columns {WIDE_KEY_COLUMNS:?}, found {key_headers:?}"),
        ));
    }

    let years = headers
        .iter()
        .skip(key_len)
        .map(|h| {
            h.trim()
                .parse::<i32>()
                .map_err(|e| IdsError::parse(&target, format!("invalid year column '{h}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| IdsError::csv(path, e))?;
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        let key = ObservationKey {
            series_short_name: field(0),
            debtor_country_id: field(1),
            debtor_country_name: field(2),
            creditor_id: field(3),
            creditor_name: field(4),
        };
        let values = (0..years.len())
            .map(|i| {
                let cell = record.get(key_len + i).unwrap_or_default().trim();
                if cell.is_empty() {
                    return Ok(None);
                }
                cell.parse::<f64>().map(Some).map_err(|e| {
                    IdsError::parse(
                        &target,
                        format!("row {}: invalid value '{cell}': {e}", line + 1),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(WideRow { key, values });
    }

    Ok(DatasetWide::new(years, rows))
}

/// Writes one concept's lookup with columns `code,name`.
pub fn write_metadata_csv(entries: &[MetadataEntry], path: &Path) -> Result<usize, IdsError> {
    let count = serialize_all(path, &METADATA_COLUMNS, entries)?;
    info!("Wrote {count} metadata entries to '{}'.", path.display());
    Ok(count)
}

/// Reads a lookup written by [`write_metadata_csv`].
pub fn read_metadata_csv(path: &Path) -> Result<Vec<MetadataEntry>, IdsError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| IdsError::csv(path, e))?;
    reader
        .deserialize::<MetadataEntry>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IdsError::csv(path, e))
}

/// Writes the last-updated date of each series with columns `series,last_updated`.
pub fn write_last_updated_csv(
    last_updated: &BTreeMap<String, NaiveDate>,
    path: &Path,
) -> Result<usize, IdsError> {
    let rows = last_updated.iter().map(|(series, date)| LastUpdatedRow {
        series,
        last_updated: date.format("%Y-%m-%d").to_string(),
    });
    serialize_all(path, &LAST_UPDATED_COLUMNS, rows)
}
