//! Result list and run report output

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{NickForgeError, Result};
use crate::scheduler::RunSummary;
use crate::types::Candidate;

/// Render names as a newline-delimited list
pub fn render_list(names: &[Candidate]) -> String {
    names
        .iter()
        .map(Candidate::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Timestamped file name for a saved list
pub fn default_file_name(now: DateTime<Utc>) -> String {
    format!("nicks_{}.txt", now.format("%Y%m%d_%H%M%S_%3f"))
}

/// Write the list into `dir` under a timestamped name, returning the path
pub fn write_list(dir: &Path, names: &[Candidate]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| {
        NickForgeError::io(e.to_string(), Some(dir.to_string_lossy().to_string()))
    })?;

    let path = dir.join(default_file_name(Utc::now()));
    let mut content = render_list(names);
    if !content.is_empty() {
        content.push('\n');
    }

    std::fs::write(&path, content).map_err(|e| {
        NickForgeError::io(e.to_string(), Some(path.to_string_lossy().to_string()))
    })?;
    tracing::debug!(path = %path.display(), count = names.len(), "Saved name list");
    Ok(path)
}

/// Save a run summary as pretty JSON
pub fn write_report(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NickForgeError::io(e.to_string(), Some(parent.to_string_lossy().to_string()))
            })?;
        }
    }

    let content = serde_json::to_string_pretty(summary).map_err(|e| {
        NickForgeError::internal(format!("Failed to serialize run report: {}", e))
    })?;

    std::fs::write(path, content).map_err(|e| {
        NickForgeError::io(e.to_string(), Some(path.to_string_lossy().to_string()))
    })
}

/// Load a report written by [`write_report`]
pub fn load_report(path: &Path) -> Result<RunSummary> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        NickForgeError::io(e.to_string(), Some(path.to_string_lossy().to_string()))
    })?;

    serde_json::from_str(&content).map_err(|e| NickForgeError::parse(e.to_string(), Some(content)))
}
