//! Retrieval and decoding of the generation feed.
use crate::error::GridError;
use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// The default location of the feed
pub const DEFAULT_FEED_URL: &str =
    "https://www.taipower.com.tw/d006/loadGraph/loadGraph/data/genary.json";

/// Some servers reject requests without a browser-like user agent
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; ",
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// The decoded body of the feed
#[derive(Debug, Deserialize, PartialEq)]
pub struct FeedPayload {
    /// One entry per row of the generation table. Each row should itself be an array.
    #[serde(rename = "aaData")]
    pub rows: Vec<Value>,
}

impl FeedPayload {
    /// Decode a payload from JSON text
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body.trim_start_matches('\u{feff}'))
    }

    /// Read a payload previously saved to disk
    pub fn from_path(file_path: &Path) -> Result<Self> {
        let body = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        Self::from_json(&body).with_context(|| format!("Invalid payload in {}", file_path.display()))
    }
}

/// Fetch the feed with a single HTTP GET request.
///
/// Any failure, including a timeout or a non-success status, is returned as
/// [`GridError::Fetch`]. No retries are attempted.
pub fn fetch(url: &str, timeout: Duration) -> Result<FeedPayload, GridError> {
    let fetch_err = |message: String| GridError::Fetch {
        url: url.to_string(),
        message,
    };

    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|err| fetch_err(format!("client build failed: {err}")))?;

    debug!("Requesting {url}");
    let response = client
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .map_err(|err| fetch_err(err.to_string()))?
        .error_for_status()
        .map_err(|err| fetch_err(err.to_string()))?;
    let body = response.text().map_err(|err| fetch_err(err.to_string()))?;
    debug!("Received {} bytes", body.len());

    FeedPayload::from_json(&body).map_err(|err| fetch_err(format!("invalid payload: {err}")))
}
