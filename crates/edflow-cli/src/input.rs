//! Loading CSV text and transform options from disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use edflow_model::TransformOptions;
use tracing::debug;

/// Reads a CSV export. Invalid UTF-8 sequences are replaced rather than
/// rejected.
pub fn read_csv_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read CSV {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "CSV loaded");
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Loads transform options from a JSON file, or defaults when no file is
/// given.
pub fn load_options(path: Option<&Path>) -> Result<TransformOptions> {
    let Some(path) = path else {
        return Ok(TransformOptions::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("read options {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse options {}", path.display()))
}
