//! TOML configuration: data sources, base strategy, sweep axes, output.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use moodlab_core::{BacktestError, StrategyParams};

use crate::sweep::SweepAxes;

/// Unique identifier for a parameter set (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] BacktestError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataSection {
    pub prices: Option<PathBuf>,
    pub signals: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SweepSection {
    #[serde(flatten)]
    pub axes: SweepAxes,
    pub parallel: bool,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            axes: SweepAxes::default(),
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
        }
    }
}

/// Full configuration file. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BacktestConfig {
    pub data: DataSection,
    pub strategy: StrategyParams,
    pub sweep: SweepSection,
    pub output: OutputSection,
}

impl BacktestConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.strategy.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }
}

/// Deterministic id for a parameter set: BLAKE3 over its JSON encoding.
///
/// Two runs with identical parameters share the same id.
pub fn run_id(params: &StrategyParams) -> RunId {
    // A struct of plain numbers always serializes; the empty fallback is unreachable.
    let json = serde_json::to_vec(params).unwrap_or_default();
    blake3::hash(&json).to_hex().to_string()
}
