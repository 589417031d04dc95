use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::model::SourceUnit;

/// Read one source file from disk.
pub fn load(path: &Path) -> Result<SourceUnit> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    debug!(file = %path.display(), bytes = text.len(), "source loaded");

    let mut unit = from_text(&path.display().to_string(), text);
    unit.path = path.to_path_buf();
    Ok(unit)
}

/// Wrap in-memory source. A missing final newline is added so every
/// statement, the last one included, ends in a line terminator.
pub fn from_text(name: &str, mut text: String) -> SourceUnit {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    SourceUnit {
        path: name.into(),
        name: name.to_string(),
        text,
    }
}
