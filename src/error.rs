//! The errors which abort a sampling run.
use std::path::PathBuf;
use thiserror::Error;

/// An unrecoverable failure during a sampling run.
///
/// Rows of the feed which can't be read are not errors: see [`crate::parser::SkipReason`].
#[derive(Debug, Error)]
pub enum GridError {
    /// The feed could not be retrieved or decoded
    #[error("Failed to fetch generation data from {url}: {message}")]
    Fetch {
        /// The URL of the feed
        url: String,
        /// What went wrong
        message: String,
    },
    /// The feed contained no usable observations
    #[error("No usable observations in the feed ({skipped} rows skipped)")]
    EmptySample {
        /// The number of rows which were skipped
        skipped: usize,
    },
    /// The existing history table could not be read
    #[error("Failed to read history table {}: {message}", .path.display())]
    StorageRead {
        /// Path to the history table
        path: PathBuf,
        /// What went wrong
        message: String,
    },
    /// The history table could not be written
    #[error("Failed to write history table {}: {message}", .path.display())]
    StorageWrite {
        /// Path to the history table
        path: PathBuf,
        /// What went wrong
        message: String,
    },
}
