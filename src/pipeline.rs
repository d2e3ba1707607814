//! Functionality for running one sampling pass, from payload to persisted history.
use crate::aggregate::AggregatedSample;
use crate::category::CategoryRegistry;
use crate::error::GridError;
use crate::feed::FeedPayload;
use crate::history::HistoryTable;
use crate::metrics::Metrics;
use crate::parser::parse_rows;
use crate::row::RowShaper;
use crate::time::SampleTime;
use crate::units::{EmissionIntensity, Power};
use log::{info, warn};
use std::path::Path;

/// A summary of a sample which was merged into the history table
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// The key of the new row
    pub timestamp: SampleTime,
    /// Rows in the history table after merging
    pub row_count: usize,
    /// Total output of the sample
    pub total_output: Power,
    /// Emission intensity of the sample
    pub emission_intensity: EmissionIntensity,
    /// Rows of the feed which were skipped
    pub skipped: usize,
}

/// What happened to a sample
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The sample was merged into the history table
    Merged(RunSummary),
    /// Total output was not positive, so the history table was left alone
    Skipped {
        /// The total output of the sample
        total_output: Power,
    },
}

/// Process one feed payload and merge the result into the history table at `history_path`.
///
/// The history table is only written once the new row has been built and merged, so if anything
/// goes wrong the file on disk is left as it was.
///
/// # Arguments
///
/// * `payload` - The decoded feed
/// * `timestamp` - When the feed was sampled
/// * `registry` - Known categories and their carbon factors
/// * `shaper` - Determines the layout of the new row
/// * `history_path` - Path to the history CSV file
///
/// # Returns
///
/// The outcome of the run, or [`GridError::EmptySample`] if the payload had no usable rows.
pub fn process_payload(
    payload: &FeedPayload,
    timestamp: SampleTime,
    registry: &CategoryRegistry,
    shaper: RowShaper,
    history_path: &Path,
) -> Result<RunOutcome, GridError> {
    let parsed = parse_rows(&payload.rows, registry);
    let skipped = parsed.skipped.len();
    info!(
        "Parsed {} observations from {} rows ({skipped} skipped)",
        parsed.observations.len(),
        payload.rows.len()
    );
    if parsed.observations.is_empty() {
        return Err(GridError::EmptySample { skipped });
    }

    let sample = AggregatedSample::from_observations(timestamp, &parsed.observations);
    let total_output = sample.total_output();
    if total_output.value() <= 0.0 {
        warn!(
            "Total output at {timestamp} is {} MW: not recording this sample",
            total_output.value()
        );
        return Ok(RunOutcome::Skipped { total_output });
    }
    let metrics = Metrics::compute(&sample, registry);

    let mut history = HistoryTable::load(history_path)?;
    info!(
        "Loaded {} rows of history from {}",
        history.len(),
        history_path.display()
    );
    let known_categories = RowShaper::known_categories(registry, history.columns());
    let row = shaper.shape(&sample, &metrics, &known_categories);
    history.merge(row);
    history.persist(history_path)?;

    let summary = RunSummary {
        timestamp,
        row_count: history.len(),
        total_output: metrics.total_output,
        emission_intensity: metrics.emission_intensity,
        skipped,
    };
    info!(
        "Recorded {timestamp}: {} MW, {} kgCO2/kWh ({} rows in {})",
        summary.total_output.value(),
        summary.emission_intensity.value(),
        summary.row_count,
        history_path.display()
    );

    Ok(RunOutcome::Merged(summary))
}
