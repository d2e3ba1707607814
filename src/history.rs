//! The persisted history of samples.
//!
//! The history is a CSV file whose first column is the sample timestamp and whose other columns
//! are numeric. It is read in full at the start of a run, merged with the new row in memory and
//! then rewritten in full. The set of columns only ever grows.
use crate::error::GridError;
use crate::row::{
    INTENSITY_COLUMN, Row, TIMESTAMP_COLUMN, TOTAL_EMISSIONS_COLUMN, TOTAL_OUTPUT_COLUMN,
};
use crate::time::SampleTime;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::debug;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Byte-order mark which some tools write at the start of UTF-8 CSV files
const UTF8_BOM: char = '\u{feff}';

/// Metric column names used by older files, with their current names
const LEGACY_COLUMNS: [(&str, &str); 3] = [
    ("總發電量(MW)", TOTAL_OUTPUT_COLUMN),
    ("碳排放量(TCO₂)", TOTAL_EMISSIONS_COLUMN),
    ("每度電碳排(kgCO₂/kWh)", INTENSITY_COLUMN),
];

/// The current name for a column header
fn column_name(header: &str) -> String {
    LEGACY_COLUMNS
        .iter()
        .find(|&&(legacy, _)| legacy == header)
        .map_or(header, |&(_, current)| current)
        .to_string()
}

/// A table of rows, unique by timestamp
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryTable {
    columns: IndexSet<String>,
    rows: Vec<Row>,
}

/// Parse a cell of the history table.
///
/// Empty cells are read as zero. Older files stored shares as text with a trailing `%`, which we
/// accept.
fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(0.0);
    }

    let cell = cell.strip_suffix('%').unwrap_or(cell).trim_end();
    cell.parse::<f64>().ok().filter(|value| value.is_finite())
}

impl HistoryTable {
    /// Load a history table from a CSV file.
    ///
    /// If the file does not exist, an empty table with no columns is returned. Any problem reading
    /// a file which does exist, or checking whether it exists, is an error: we never silently
    /// discard history.
    pub fn load(file_path: &Path) -> Result<Self, GridError> {
        let read_err = |message: String| GridError::StorageRead {
            path: file_path.to_path_buf(),
            message,
        };

        if !file_path
            .try_exists()
            .map_err(|err| read_err(err.to_string()))?
        {
            return Ok(Self::default());
        }

        let mut reader =
            csv::Reader::from_path(file_path).map_err(|err| read_err(err.to_string()))?;
        let headers = reader
            .headers()
            .map_err(|err| read_err(err.to_string()))?
            .iter()
            .map(|header| column_name(header.trim_start_matches(UTF8_BOM).trim()))
            .collect_vec();

        // The key is the first column, whatever it is called. It is written back as `timestamp`.
        let Some((key, headers)) = headers.split_first() else {
            return Err(read_err("File has no header".into()));
        };
        if key != TIMESTAMP_COLUMN {
            debug!("Reading column '{key}' as {TIMESTAMP_COLUMN}");
        }

        let mut columns = IndexSet::new();
        for header in headers {
            if header == TIMESTAMP_COLUMN {
                return Err(read_err(format!(
                    "Column {TIMESTAMP_COLUMN} must be the first column"
                )));
            }
            if !columns.insert(header.clone()) {
                return Err(read_err(format!("Column {header} appears more than once")));
            }
        }

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|err| read_err(err.to_string()))?;

            // Line 1 is the header
            let line = line + 2;
            let timestamp: SampleTime = record[0]
                .parse()
                .map_err(|err| read_err(format!("line {line}: {err}")))?;
            let values: IndexMap<String, f64> = columns
                .iter()
                .zip(record.iter().skip(1))
                .map(|(column, cell)| {
                    parse_cell(cell)
                        .map(|value| (column.clone(), value))
                        .ok_or_else(|| {
                            read_err(format!("line {line}: invalid value '{cell}' for {column}"))
                        })
                })
                .try_collect()?;
            rows.push(Row::new(timestamp, values));
        }

        Ok(Self { columns, rows })
    }

    /// The names of all columns except the timestamp, in order
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.columns.iter()
    }

    /// The rows of the table, in order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The number of rows in the table
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row with the given timestamp, if any
    pub fn get(&self, timestamp: SampleTime) -> Option<&Row> {
        self.rows.iter().find(|row| row.timestamp == timestamp)
    }

    /// Merge a new row into the table.
    ///
    /// Columns missing from either side are added with zeros. The row is then appended, and if
    /// there is already a row with the same timestamp, the new one replaces it.
    pub fn merge(&mut self, row: Row) {
        // Add new columns to the existing rows
        for column in row.values.keys() {
            if self.columns.insert(column.clone()) {
                for existing in &mut self.rows {
                    existing.values.insert(column.clone(), 0.0);
                }
            }
        }

        // Lay out the new row's values in table order, filling gaps with zeros
        let values: IndexMap<String, f64> = self
            .columns
            .iter()
            .map(|column| (column.clone(), row.get(column).unwrap_or(0.0)))
            .collect();
        self.rows.push(Row::new(row.timestamp, values));

        self.deduplicate();
    }

    /// Remove rows with duplicate timestamps, keeping the one appended last
    fn deduplicate(&mut self) {
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in self.rows.drain(..).rev() {
            if seen.insert(row.timestamp) {
                rows.push(row);
            }
        }
        rows.reverse();
        self.rows = rows;
    }

    /// Write the whole table to a CSV file, replacing its contents.
    ///
    /// The table is written to a temporary file in the same folder which is then moved into
    /// place, so the existing file is left intact if writing fails.
    pub fn persist(&self, file_path: &Path) -> Result<(), GridError> {
        let write_err = |message: String| GridError::StorageWrite {
            path: file_path.to_path_buf(),
            message,
        };

        let dir_path = match file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir_path).map_err(|err| write_err(err.to_string()))?;

        let mut temp_file =
            NamedTempFile::new_in(&dir_path).map_err(|err| write_err(err.to_string()))?;
        {
            let mut writer = csv::Writer::from_writer(temp_file.as_file_mut());
            let header =
                std::iter::once(TIMESTAMP_COLUMN).chain(self.columns.iter().map(String::as_str));
            writer
                .write_record(header)
                .map_err(|err| write_err(err.to_string()))?;
            for row in &self.rows {
                let record = std::iter::once(row.timestamp.to_string()).chain(
                    self.columns
                        .iter()
                        .map(|column| row.get(column).unwrap_or(0.0).to_string()),
                );
                writer
                    .write_record(record)
                    .map_err(|err| write_err(err.to_string()))?;
            }
            writer.flush().map_err(|err| write_err(err.to_string()))?;
        }

        temp_file
            .persist(file_path)
            .map_err(|err| write_err(err.to_string()))?;

        Ok(())
    }
}
