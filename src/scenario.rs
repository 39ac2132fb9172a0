//! Loading simulation scenarios from TOML or JSON files

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::models::SimulationInput;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("unsupported scenario format: {file} (expected .toml or .json)")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

pub fn detect_format(path: &Path) -> Result<Format, ScenarioError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ScenarioError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Parse scenario text in the given format. `path` is only used in errors.
pub fn parse_scenario(
    content: &str,
    format: Format,
    path: &Path,
) -> Result<SimulationInput, ScenarioError> {
    let parsed = match format {
        Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|detail| ScenarioError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

pub fn load_scenario(path: &Path) -> Result<SimulationInput, ScenarioError> {
    let format = detect_format(path)?;
    let content = fs::read_to_string(path)?;
    let input = parse_scenario(&content, format, path)?;
    debug!(
        file = %path.display(),
        groups = input.groups.len(),
        tier = input.tier.number(),
        "scenario loaded"
    );
    Ok(input)
}
