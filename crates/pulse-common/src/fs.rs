//! JSON file helpers shared by the pipeline stages

use crate::error::Result;
use serde_json::Value;
use std::path::Path;

/// Read and parse a JSON file
pub fn read_json(path: impl AsRef<Path>) -> Result<Value> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Write a JSON value to a file, pretty-printed
pub fn write_json_pretty(path: impl AsRef<Path>, value: &Value) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
