//! Code for turning the rows of a feed payload into generation observations.
//!
//! The feed mixes per-unit rows with headers and subtotals, so a row which can't be read is
//! skipped rather than treated as an error. Every skip is recorded with its reason.
use crate::category::CategoryRegistry;
use crate::id::CategoryID;
use crate::row::is_reserved_label;
use crate::units::Power;
use derive_more::Display;
use indexmap::IndexSet;
use log::{debug, warn};
use serde_json::Value;

/// Text which must appear in the first field of a row for it to carry a category label
const LABEL_MARKER: &str = "b>";

/// Index of the field holding the rated capacity
const CAPACITY_FIELD: usize = 3;

/// Index of the field holding the actual output
const OUTPUT_FIELD: usize = 4;

/// One usable row of the feed
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// The generation category the row belongs to
    pub category: CategoryID,
    /// Rated capacity in MW
    pub capacity: Power,
    /// Actual output in MW. This may be negative (e.g. for storage which is charging).
    pub output: Power,
}

/// Why a row of the feed was not used
#[derive(Debug, Clone, PartialEq, Display)]
pub enum SkipReason {
    /// The row is not an array
    #[display("row is not an array")]
    NotAnArray,
    /// The row has no fields
    #[display("row is empty")]
    EmptyRow,
    /// The first field doesn't contain a category label
    #[display("first field does not contain a category label")]
    NoLabel,
    /// The category label is blank
    #[display("category label is empty")]
    EmptyLabel,
    /// The category's columns would clash with the metric columns
    #[display("category label '{_0}' clashes with a metric column")]
    ReservedLabel(String),
    /// A required field is absent
    #[display("field {_0} is missing")]
    MissingField(usize),
    /// A required field can't be read as a finite number
    #[display("field {index} is not a valid number: {value}")]
    InvalidNumber {
        /// Index of the field
        index: usize,
        /// The offending value
        value: String,
    },
    /// The rated capacity is below zero
    #[display("capacity is negative: {_0}")]
    NegativeCapacity(f64),
}

/// A row which was skipped, along with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// The position of the row in the payload
    pub index: usize,
    /// Why the row was skipped
    pub reason: SkipReason,
}

/// The result of parsing all the rows in a payload
#[derive(Debug, Default, PartialEq)]
pub struct ParsedRows {
    /// Rows which could be used, in payload order
    pub observations: Vec<Observation>,
    /// Rows which were skipped
    pub skipped: Vec<SkippedRow>,
}

/// Extract the category label from the first field of a row.
///
/// The label sits inside a markup fragment (e.g. `<A NAME='x'></A><b>燃煤(Coal)</b>`), so we take
/// the text between the last two `>` characters, up to the next `<`.
pub fn extract_label(field: &str) -> Result<&str, SkipReason> {
    if !field.contains(LABEL_MARKER) {
        return Err(SkipReason::NoLabel);
    }

    let segment = field.rsplit('>').nth(1).ok_or(SkipReason::NoLabel)?;
    let label = segment.split('<').next().unwrap_or_default().trim();
    if label.is_empty() {
        return Err(SkipReason::EmptyLabel);
    }

    Ok(label)
}

/// Read a field as a finite number. Numbers may be given as JSON strings or JSON numbers.
fn parse_number(row: &[Value], index: usize) -> Result<f64, SkipReason> {
    let field = row.get(index).ok_or(SkipReason::MissingField(index))?;
    let value = match field {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };

    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| SkipReason::InvalidNumber {
            index,
            value: match field {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        })
}

/// Parse a single row of the feed into an [`Observation`]
pub fn parse_row(row: &Value) -> Result<Observation, SkipReason> {
    let fields = row.as_array().ok_or(SkipReason::NotAnArray)?;
    let first = fields.first().ok_or(SkipReason::EmptyRow)?;
    let label = extract_label(first.as_str().ok_or(SkipReason::NoLabel)?)?;
    if is_reserved_label(label) {
        return Err(SkipReason::ReservedLabel(label.to_string()));
    }

    let capacity = parse_number(fields, CAPACITY_FIELD)?;
    if capacity < 0.0 {
        return Err(SkipReason::NegativeCapacity(capacity));
    }
    let output = parse_number(fields, OUTPUT_FIELD)?;

    Ok(Observation {
        category: label.into(),
        capacity: Power(capacity),
        output: Power(output),
    })
}

/// Parse all the rows of a payload, skipping those which can't be used.
///
/// Categories which are not in `registry` are kept, but a warning is logged for each.
pub fn parse_rows(rows: &[Value], registry: &CategoryRegistry) -> ParsedRows {
    let mut parsed = ParsedRows::default();
    let mut unknown = IndexSet::new();
    for (index, row) in rows.iter().enumerate() {
        match parse_row(row) {
            Ok(observation) => {
                if registry.get(observation.category.as_str()).is_none() {
                    unknown.insert(observation.category.clone());
                }
                parsed.observations.push(observation);
            }
            Err(reason) => {
                debug!("Skipping row {index}: {reason}");
                parsed.skipped.push(SkippedRow { index, reason });
            }
        }
    }

    for category in unknown {
        warn!("Unrecognised category {category}: it will be recorded with a zero carbon factor");
    }

    parsed
}
