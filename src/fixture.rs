//! Fixtures for tests

use crate::category::CategoryRegistry;
use crate::feed::FeedPayload;
use rstest::fixture;
use serde_json::{Value, json};

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A row of the feed as Taipower formats it
pub fn feed_row(label: &str, capacity: &str, output: &str) -> Value {
    json!([
        format!("<A NAME='x'></A><b>{label}</b>"),
        "",
        "unit",
        capacity,
        output,
        "",
        ""
    ])
}

#[fixture]
pub fn registry() -> CategoryRegistry {
    CategoryRegistry::taipower()
}

/// A payload with two coal units, a wind farm and a subtotal row
#[fixture]
pub fn payload() -> FeedPayload {
    FeedPayload {
        rows: vec![
            feed_row("燃煤(Coal)", "100", "50"),
            feed_row("燃煤(Coal)", "100", "10"),
            feed_row("風力(Wind)", "20", "20"),
            json!(["", "", "小計", "220", "80", "", ""]),
        ],
    }
}
