//! Persistence layer.
//!
//! Reads the JSON input files and writes a slate's prediction records to a
//! dated JSON file. Everything here returns `anyhow::Result` so callers get
//! the file path in the error chain.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::GamePrediction;

/// Everything produced for one slate date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlateFile {
    pub slate_date: NaiveDate,
    pub config_version: String,
    pub predictions: Vec<GamePrediction>,
}

/// Deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    debug!(path = %path.display(), bytes = json.len(), "JSON file read");
    Ok(value)
}

/// Path of the slate file for a date inside `dir`.
pub fn slate_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("predictions_{}.json", date.format("%Y-%m-%d")))
}

/// Write a slate to `<dir>/predictions_<date>.json`, creating `dir` if needed.
pub fn save_slate(dir: &Path, slate: &SlateFile) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir {}", dir.display()))?;

    let path = slate_path(dir, slate.slate_date);
    let json = serde_json::to_string_pretty(slate).context("Failed to serialise slate")?;
    std::fs::write(&path, &json)
        .with_context(|| format!("Failed to write slate to {}", path.display()))?;

    info!(
        path = %path.display(),
        games = slate.predictions.len(),
        "Slate saved"
    );
    Ok(path)
}

/// Load a previously saved slate. Returns None if no file exists for the date.
pub fn load_slate(dir: &Path, date: NaiveDate) -> Result<Option<SlateFile>> {
    let path = slate_path(dir, date);
    if !path.exists() {
        debug!(path = %path.display(), "No saved slate");
        return Ok(None);
    }
    read_json(&path).map(Some)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
