//! # CSV Persistence Tests

use chrono::NaiveDate;
use idsflow::persist::{
    read_long_csv, read_metadata_csv, read_wide_csv, write_last_updated_csv, write_long_csv,
    write_metadata_csv, write_wide_csv,
};
use idsflow::{
    pivot_long, pivot_wide, DatasetLong, DuplicatePolicy, IdsError, MetadataEntry, Observation,
};
use std::collections::BTreeMap;
use std::fs;
use tempfile::tempdir;

fn obs(series: &str, debtor: (&str, &str), creditor: (&str, &str), year: i32, value: f64) -> Observation {
    Observation {
        series_short_name: series.to_string(),
        debtor_country_id: debtor.0.to_string(),
        debtor_country_name: debtor.1.to_string(),
        creditor_id: creditor.0.to_string(),
        creditor_name: creditor.1.to_string(),
        year,
        value,
    }
}

fn sample_dataset() -> DatasetLong {
    DatasetLong::from_observations(vec![
        obs("debt_stock", ("KEN", "Kenya"), ("CHN", "China"), 2020, 7.5),
        obs("debt_stock", ("KEN", "Kenya"), ("CHN", "China"), 2021, 8.25),
        obs("debt_stock", ("AGO", "Angola"), ("FRA", "France, Republic of"), 2021, 1.0e9),
        obs("disbursements", ("AGO", "Angola"), ("CHN", "China"), 2019, 0.5),
    ])
}

#[test]
fn test_wide_csv_round_trip_restores_long_table() -> anyhow::Result<()> {
    // --- Arrange ---
    let dir = tempdir()?;
    let path = dir.path().join("ids_bilateral_wide.csv");
    let long = sample_dataset();
    let wide = pivot_wide(&long, DuplicatePolicy::Error)?;

    // --- Act ---
    let rows = write_wide_csv(&wide, &path)?;
    let restored = read_wide_csv(&path)?;

    // --- Assert ---
    assert_eq!(rows, 3);
    assert_eq!(restored.years(), &[2019, 2020, 2021]);
    assert_eq!(pivot_long(&restored), long);
    Ok(())
}

#[test]
fn test_wide_csv_layout() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("wide.csv");
    let wide = pivot_wide(&sample_dataset(), DuplicatePolicy::Error)?;

    write_wide_csv(&wide, &path)?;
    let content = fs::read_to_string(&path)?;
    let mut lines = content.lines();

    assert_eq!(
        lines.next(),
        Some("series_short_name,debtor_country_id,debtor_country_name,creditor_id,creditor_name,2019,2020,2021")
    );
    assert!(
        content.contains("debt_stock,AGO,Angola,FRA,\"France, Republic of\",,,1000000000"),
        "unexpected content:\n{content}"
    );
    assert!(content.contains("debt_stock,KEN,Kenya,CHN,China,,7.5,8.25"));
    Ok(())
}

#[test]
fn test_long_csv_round_trip() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ids_bilateral_long.csv");
    let long = sample_dataset();

    let rows = write_long_csv(&long, &path)?;
    let restored = read_long_csv(&path)?;

    assert_eq!(rows, 4);
    assert_eq!(restored, long);
    let header = fs::read_to_string(&path)?;
    assert!(header.starts_with(
        "series_short_name,debtor_country_id,debtor_country_name,creditor_id,creditor_name,year,value"
    ));
    Ok(())
}

#[test]
fn test_metadata_csv_round_trip() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("metadata").join("country.csv");
    let entries = vec![
        MetadataEntry {
            code: "AGO".to_string(),
            name: "Angola".to_string(),
        },
        MetadataEntry {
            code: "CIV".to_string(),
            name: "Cote d'Ivoire".to_string(),
        },
    ];

    write_metadata_csv(&entries, &path)?;

    assert!(fs::read_to_string(&path)?.starts_with("code,name\n"));
    assert_eq!(read_metadata_csv(&path)?, entries);
    Ok(())
}

#[test]
fn test_last_updated_csv_contents() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("last_updated.csv");
    let mut dates = BTreeMap::new();
    dates.insert(
        "interest_payments".to_string(),
        NaiveDate::from_ymd_opt(2022, 12, 6).unwrap(),
    );
    dates.insert(
        "debt_stock".to_string(),
        NaiveDate::from_ymd_opt(2022, 11, 30).unwrap(),
    );

    let rows = write_last_updated_csv(&dates, &path)?;

    assert_eq!(rows, 2);
    assert_eq!(
        fs::read_to_string(&path)?,
        "series,last_updated\ndebt_stock,2022-11-30\ninterest_payments,2022-12-06\n"
    );
    Ok(())
}

#[test]
fn test_empty_tables_keep_their_header() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let metadata = dir.path().join("metadata").join("time.csv");
    let long = dir.path().join("long.csv");
    let updated = dir.path().join("last_updated.csv");

    assert_eq!(write_metadata_csv(&[], &metadata)?, 0);
    assert_eq!(write_long_csv(&DatasetLong::default(), &long)?, 0);
    assert_eq!(write_last_updated_csv(&BTreeMap::new(), &updated)?, 0);

    assert_eq!(fs::read_to_string(&metadata)?, "code,name\n");
    assert_eq!(
        fs::read_to_string(&long)?,
        "series_short_name,debtor_country_id,debtor_country_name,creditor_id,creditor_name,year,value\n"
    );
    assert_eq!(fs::read_to_string(&updated)?, "series,last_updated\n");
    assert!(read_metadata_csv(&metadata)?.is_empty());
    assert!(read_long_csv(&long)?.is_empty());
    Ok(())
}

#[test]
fn test_writers_create_parent_directories() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("nested").join("deeper").join("long.csv");

    write_long_csv(&sample_dataset(), &path)?;

    assert!(path.exists());
    Ok(())
}

#[test]
fn test_read_wide_csv_rejects_unexpected_header() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("bad.csv");
    fs::write(&path, "series,debtor,creditor,2020\ndebt_stock,KEN,CHN,1.0\n")?;

    let err = read_wide_csv(&path).unwrap_err();

    assert!(matches!(err, IdsError::Parse { .. }), "unexpected error: {err:?}");
    Ok(())
}

#[test]
fn test_read_wide_csv_rejects_bad_year_column() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("bad_year.csv");
    fs::write(
        &path,
        "series_short_name,debtor_country_id,debtor_country_name,creditor_id,creditor_name,total\n",
    )?;

    let err = read_wide_csv(&path).unwrap_err();

    assert!(err.to_string().contains("total"));
    Ok(())
}

#[test]
fn test_read_wide_csv_reports_bad_cell() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("bad_cell.csv");
    fs::write(
        &path,
        "series_short_name,debtor_country_id,debtor_country_name,creditor_id,creditor_name,2020\n\
         debt_stock,KEN,Kenya,CHN,China,lots\n",
    )?;

    let err = read_wide_csv(&path).unwrap_err();

    assert!(matches!(err, IdsError::Parse { ref message, .. } if message.contains("lots")));
    Ok(())
}

#[test]
fn test_read_missing_file_is_csv_error() {
    let err = read_long_csv(std::path::Path::new("/nonexistent/idsflow/long.csv")).unwrap_err();
    assert!(matches!(err, IdsError::Csv { .. }));
}
