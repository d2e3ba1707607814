//! Integration tests for recording successive samples in a history table.
use float_cmp::assert_approx_eq;
use gridcarbon::category::CategoryRegistry;
use gridcarbon::error::GridError;
use gridcarbon::feed::FeedPayload;
use gridcarbon::history::HistoryTable;
use gridcarbon::pipeline::{RunOutcome, process_payload};
use gridcarbon::row::RowShaper;
use gridcarbon::time::SampleTime;
use itertools::Itertools;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn time(s: &str) -> SampleTime {
    s.parse().unwrap()
}

fn payload(rows: &[(&str, f64)]) -> FeedPayload {
    FeedPayload {
        rows: rows
            .iter()
            .map(|(label, output)| {
                json!([format!("<b>{label}</b>"), "", "unit", 1000.0, output])
            })
            .collect(),
    }
}

fn record(payload: &FeedPayload, timestamp: &str, history_path: &Path) -> RunOutcome {
    process_payload(
        payload,
        time(timestamp),
        &CategoryRegistry::taipower(),
        RowShaper::new(false),
        history_path,
    )
    .unwrap()
}

/// A category which isn't in the registry appears partway through
#[test]
fn test_new_category_is_backfilled() {
    let dir = tempdir().unwrap();
    let history_path = dir.path().join("history.csv");

    for minute in 0..10 {
        record(
            &payload(&[("燃煤(Coal)", 100.0)]),
            &format!("2025-06-01 12:{minute:02}"),
            &history_path,
        );
    }
    record(
        &payload(&[("燃煤(Coal)", 100.0), ("地熱(Geothermal)", 5.0)]),
        "2025-06-01 12:10",
        &history_path,
    );

    let history = HistoryTable::load(&history_path).unwrap();
    assert_eq!(history.len(), 11);
    assert_eq!(history.columns().last().unwrap(), "地熱(Geothermal)(MW)");
    for row in &history.rows()[..10] {
        assert_approx_eq!(f64, row.get("地熱(Geothermal)(MW)").unwrap(), 0.0);
    }
    assert_approx_eq!(
        f64,
        history.rows()[10].get("地熱(Geothermal)(MW)").unwrap(),
        5.0
    );

    // The category is remembered even when it's no longer reported
    record(
        &payload(&[("燃煤(Coal)", 100.0)]),
        "2025-06-01 12:20",
        &history_path,
    );
    let history = HistoryTable::load(&history_path).unwrap();
    assert_approx_eq!(
        f64,
        history.rows()[11].get("地熱(Geothermal)(MW)").unwrap(),
        0.0
    );
}

/// Resampling the same minute replaces the earlier row
#[test]
fn test_same_timestamp_is_replaced() {
    let dir = tempdir().unwrap();
    let history_path = dir.path().join("history.csv");

    record(&payload(&[("燃煤(Coal)", 100.0)]), "2025-06-01 12:00", &history_path);
    record(&payload(&[("燃煤(Coal)", 200.0)]), "2025-06-01 12:05", &history_path);
    record(&payload(&[("燃煤(Coal)", 300.0)]), "2025-06-01 12:00", &history_path);

    let history = HistoryTable::load(&history_path).unwrap();
    assert_eq!(
        history
            .rows()
            .iter()
            .map(|row| row.get("total_generation(MW)").unwrap())
            .collect_vec(),
        [200.0, 300.0]
    );
}

/// Files written by older versions used Chinese metric headers and stored shares as percentages
#[test]
fn test_legacy_history_file() {
    let dir = tempdir().unwrap();
    let history_path = dir.path().join("history.csv");
    fs::write(
        &history_path,
        "\u{feff}時間,總發電量(MW),碳排放量(TCO₂),每度電碳排(kgCO₂/kWh),燃煤(Coal)(MW),燃煤(Coal)(%)\n\
         2025-05-31 23:50,100,90.0,0.9,100,100.0%\n",
    )
    .unwrap();

    record(&payload(&[("風力(Wind)", 50.0)]), "2025-06-01 00:00", &history_path);

    let history = HistoryTable::load(&history_path).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.columns().all(|column| !column.starts_with("總發電量")));
    let old = history.get(time("2025-05-31 23:50")).unwrap();
    assert_approx_eq!(f64, old.get("燃煤(Coal)(%)").unwrap(), 100.0);
    assert_approx_eq!(f64, old.get("emission_intensity(kgCO2/kWh)").unwrap(), 0.9);
    assert_approx_eq!(f64, old.get("風力(Wind)(MW)").unwrap(), 0.0);
    let new = history.get(time("2025-06-01 00:00")).unwrap();
    assert_approx_eq!(f64, new.get("燃煤(Coal)(MW)").unwrap(), 0.0);
    assert_approx_eq!(f64, new.get("renewable_share(%)").unwrap(), 100.0);
}

/// A sample with nothing usable in it is an error and leaves the table alone
#[test]
fn test_empty_sample() {
    let dir = tempdir().unwrap();
    let history_path = dir.path().join("history.csv");
    record(&payload(&[("燃煤(Coal)", 100.0)]), "2025-06-01 12:00", &history_path);
    let before = fs::read_to_string(&history_path).unwrap();

    let result = process_payload(
        &FeedPayload { rows: Vec::new() },
        time("2025-06-01 12:10"),
        &CategoryRegistry::taipower(),
        RowShaper::default(),
        &history_path,
    );
    assert!(matches!(result, Err(GridError::EmptySample { skipped: 0 })));
    assert_eq!(fs::read_to_string(&history_path).unwrap(), before);
}
