//! # Response Flattener Tests
//!
//! Covers null filtering, dimension pivoting, the strict shape policy, and
//! last-updated extraction for bulk-data responses.

use chrono::NaiveDate;
use idsflow::{extract_last_updated, flatten, IdsError, Observation, RawApiResponse};
use idsflow_test_utils::{bulk_entry, bulk_response_json};
use serde_json::json;

fn response(body: String) -> RawApiResponse {
    RawApiResponse {
        url: "http://stub.local/v2/sources/6/country/all/series/S1".to_string(),
        status: 200,
        body,
    }
}

#[test]
fn test_flatten_drops_null_values() {
    // --- Arrange ---
    let body = bulk_response_json(
        "2022-12-06",
        vec![
            bulk_entry("S1", ("KEN", "Kenya"), ("CHN", "China"), 2019, json!(null)),
            bulk_entry("S1", ("KEN", "Kenya"), ("CHN", "China"), 2020, json!("123.4")),
        ],
    );

    // --- Act ---
    let observations = flatten(&response(body), "S1").unwrap();

    // --- Assert ---
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].value, 123.4);
    assert_eq!(observations[0].year, 2020);
}

#[test]
fn test_flatten_maps_dimensions_to_observation_columns() {
    let body = bulk_response_json(
        "2022-12-06",
        vec![bulk_entry(
            "S1",
            ("USA", "United States"),
            ("WLD", "World"),
            2020,
            json!("500.0"),
        )],
    );

    let observations = flatten(&response(body), "S1").unwrap();

    assert_eq!(
        observations,
        vec![Observation {
            series_short_name: "S1".to_string(),
            debtor_country_id: "USA".to_string(),
            debtor_country_name: "United States".to_string(),
            creditor_id: "WLD".to_string(),
            creditor_name: "World".to_string(),
            year: 2020,
            value: 500.0,
        }]
    );
}

#[test]
fn test_flatten_uses_caller_short_name_and_accepts_numeric_values() {
    let body = bulk_response_json(
        "2022-12-06",
        vec![bulk_entry(
            "DT.DOD.BLAT.CD",
            ("AGO", "Angola"),
            ("CHN", "China"),
            2021,
            json!(21_000_000.5),
        )],
    );

    let observations = flatten(&response(body), "debt_stock").unwrap();

    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].series_short_name, "debt_stock");
    assert_eq!(observations[0].value, 21_000_000.5);
}

#[test]
fn test_flatten_missing_dimension_fails_whole_batch() {
    let mut broken = bulk_entry("S1", ("KEN", "Kenya"), ("CHN", "China"), 2020, json!("1.0"));
    broken["variable"]
        .as_array_mut()
        .unwrap()
        .retain(|d| d["concept"] != "Counterpart-Area");
    let body = bulk_response_json(
        "2022-12-06",
        vec![
            bulk_entry("S1", ("KEN", "Kenya"), ("CHN", "China"), 2019, json!("2.0")),
            broken,
        ],
    );

    let err = flatten(&response(body), "S1").unwrap_err();

    match err {
        IdsError::Shape { target, index, message } => {
            assert_eq!(target, "S1");
            assert_eq!(index, 1);
            assert!(message.contains("counterpart-area"), "unexpected message: {message}");
        }
        other => panic!("expected a shape error, got {other:?}"),
    }
}

#[test]
fn test_flatten_duplicated_dimension_fails_whole_batch() {
    let mut conflicting = bulk_entry("S1", ("USA", "United States"), ("WLD", "World"), 2020, json!("500.0"));
    conflicting["variable"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "concept": "Country", "id": "CAN", "value": "Canada" }));
    let body = bulk_response_json("2022-12-06", vec![conflicting]);

    let err = flatten(&response(body), "S1").unwrap_err();

    match err {
        IdsError::Shape { index, message, .. } => {
            assert_eq!(index, 0);
            assert!(message.contains("duplicate 'country'"), "unexpected message: {message}");
        }
        other => panic!("expected a shape error, got {other:?}"),
    }
}

#[test]
fn test_flatten_extra_dimension_fails_whole_batch() {
    let mut extended = bulk_entry("S1", ("USA", "United States"), ("WLD", "World"), 2020, json!("500.0"));
    extended["variable"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "concept": "Bogus", "id": "X", "value": "x" }));
    let body = bulk_response_json(
        "2022-12-06",
        vec![
            bulk_entry("S1", ("KEN", "Kenya"), ("CHN", "China"), 2020, json!("1.0")),
            extended,
        ],
    );

    let err = flatten(&response(body), "S1").unwrap_err();

    match err {
        IdsError::Shape { index, message, .. } => {
            assert_eq!(index, 1);
            assert!(message.contains("unexpected 'Bogus'"), "unexpected message: {message}");
        }
        other => panic!("expected a shape error, got {other:?}"),
    }
}

#[test]
fn test_flatten_rejects_non_finite_values() {
    for raw in ["NaN", "inf", "-Infinity"] {
        let body = bulk_response_json(
            "2022-12-06",
            vec![bulk_entry("S1", ("KEN", "Kenya"), ("CHN", "China"), 2020, json!(raw))],
        );

        let err = flatten(&response(body), "S1").unwrap_err();

        assert!(
            matches!(err, IdsError::Shape { index: 0, .. }),
            "'{raw}' should be rejected, got {err:?}"
        );
    }
}

#[test]
fn test_flatten_ignores_shape_of_null_entries() {
    // Null entries are dropped before their dimensions are inspected.
    let body = bulk_response_json(
        "2022-12-06",
        vec![json!({ "variable": [], "value": null })],
    );

    let observations = flatten(&response(body), "S1").unwrap();
    assert!(observations.is_empty());
}

#[test]
fn test_flatten_rejects_non_numeric_value() {
    let body = bulk_response_json(
        "2022-12-06",
        vec![bulk_entry("S1", ("KEN", "Kenya"), ("CHN", "China"), 2020, json!("n/a"))],
    );

    let err = flatten(&response(body), "S1").unwrap_err();
    assert!(matches!(err, IdsError::Shape { index: 0, .. }));
}

#[test]
fn test_flatten_malformed_json_is_parse_error() {
    let err = flatten(&response("<html>Service unavailable</html>".to_string()), "S1").unwrap_err();
    assert!(matches!(err, IdsError::Parse { ref target, .. } if target == "S1"));
}

#[test]
fn test_flatten_missing_data_array_is_parse_error() {
    let body = json!({ "source": { "lastupdated": "2022-12-06" } }).to_string();
    let err = flatten(&response(body), "S1").unwrap_err();
    assert!(matches!(err, IdsError::Parse { .. }));
}

#[test]
fn test_extract_last_updated_from_source_block() {
    let body = bulk_response_json("2022-12-06", vec![]);
    let date = extract_last_updated(&response(body)).unwrap();
    assert_eq!(date, NaiveDate::from_ymd_opt(2022, 12, 6).unwrap());
}

#[test]
fn test_extract_last_updated_from_top_level() {
    let body = r#"{"lastupdated":"2022-12-06","source":{"data":[]}}"#.to_string();
    let date = extract_last_updated(&response(body)).unwrap();
    assert_eq!(date, NaiveDate::from_ymd_opt(2022, 12, 6).unwrap());
}

#[test]
fn test_extract_last_updated_missing_field_is_parse_error() {
    let body = json!({ "source": { "data": [] } }).to_string();
    let err = extract_last_updated(&response(body)).unwrap_err();
    assert!(matches!(err, IdsError::Parse { .. }));
}

#[test]
fn test_extract_last_updated_bad_format_is_parse_error() {
    let body = json!({ "source": { "lastupdated": "06/12/2022", "data": [] } }).to_string();
    let err = extract_last_updated(&response(body)).unwrap_err();
    assert!(err.to_string().contains("06/12/2022"));
}
