//! Sample the Taipower generation mix and record its carbon intensity.
//!
//! Each run reads one snapshot of the generation feed, aggregates the per-unit rows by category,
//! computes emissions and shares and merges the result into a CSV history table.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod aggregate;
pub mod category;
pub mod cli;
pub mod error;
pub mod feed;
pub mod history;
pub mod id;
pub mod input;
pub mod log;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod row;
pub mod settings;
pub mod time;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory where program settings are stored
pub fn get_gridcarbon_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("gridcarbon");

    path
}
