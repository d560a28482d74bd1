//! Service configuration: where the model artifacts live.
//!
//! Settings come from a TOML file under the app root; a missing file means
//! defaults. Only paths are configurable here; the topology and class set
//! are fixed by the trained model.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};
use crate::model::ModelLocations;

/// Configuration file name under the app root directory.
pub const CONFIG_FILE_NAME: &str = "skylens.toml";

/// Errors that may occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// Application directory error.
    #[error(transparent)]
    AppDir(#[from] AppDirError),
}

/// User-adjustable settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Directory holding the model artifacts; defaults to `<app root>/models`.
    pub model_dir: Option<PathBuf>,
    /// Weight archive path, relative to the model directory.
    pub weight_archive: PathBuf,
    /// Full model file path, relative to the model directory.
    pub full_model: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model_dir: None,
            weight_archive: PathBuf::from("exported_model/model_weights.npz"),
            full_model: PathBuf::from("best_model.json"),
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to defaults
    /// when no config file exists.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME);
        Self::load_from(&path)
    }

    /// Load settings from an explicit path; a missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the weight store locations using the configured model dir.
    pub fn model_locations(&self) -> Result<ModelLocations, ConfigError> {
        let dir = match &self.model_dir {
            Some(dir) => dir.clone(),
            None => app_dirs::models_dir()?,
        };
        Ok(self.locations_in(&dir))
    }

    /// Resolve the weight store locations against an explicit directory.
    pub fn locations_in(&self, dir: &Path) -> ModelLocations {
        ModelLocations {
            weight_archive: dir.join(&self.weight_archive),
            full_model: dir.join(&self.full_model),
        }
    }
}
