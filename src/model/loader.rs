//! Startup model loading with the archive → full-file fallback chain.
//!
//! `load` runs once before the service answers requests. It always returns a
//! value: either a populated network tagged with the format it came from, or
//! the terminal unavailable state carrying every attempt's failure for
//! diagnostics. There is no reload; a model becomes available again only by
//! restarting with corrected files in place.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::classes::WeatherClass;

use super::arch::{Architecture, INPUT_SHAPE};
use super::archive::read_weight_archive;
use super::errors::ModelError;
use super::full::FullModelFile;
use super::network::Network;

/// Which on-disk format a loaded model came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    /// NPZ weight archive assigned into the code-built architecture.
    Archive,
    /// Self-contained JSON model file.
    FullFile,
}

impl ModelSource {
    /// Short identifier used in logs and payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelSource::Archive => "archive",
            ModelSource::FullFile => "fullfile",
        }
    }
}

/// Where the two weight stores are expected on disk.
#[derive(Debug, Clone)]
pub struct ModelLocations {
    /// NPZ weight archive path (preferred format).
    pub weight_archive: PathBuf,
    /// Self-contained JSON model path (fallback format).
    pub full_model: PathBuf,
}

/// One failed format attempt, retained for diagnostics.
#[derive(Debug)]
pub struct LoadAttempt {
    /// Format that was attempted.
    pub source: ModelSource,
    /// Path that was probed.
    pub path: PathBuf,
    /// Why the attempt failed.
    pub error: ModelError,
}

/// A populated, inference-ready model and its provenance.
#[derive(Debug)]
pub struct LoadedModel {
    /// Format the weights came from.
    pub source: ModelSource,
    /// Fully-assigned network.
    pub network: Network,
}

/// Process-wide model state, written once at startup.
#[derive(Debug)]
pub enum ModelState {
    /// A model loaded successfully from one of the formats.
    Loaded(LoadedModel),
    /// Every format failed or was absent; the service runs degraded.
    Unavailable(Vec<LoadAttempt>),
}

impl ModelState {
    /// Whether a model is ready to serve inference.
    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }

    /// Source format of the loaded model, if any.
    pub fn source(&self) -> Option<ModelSource> {
        match self {
            ModelState::Loaded(model) => Some(model.source),
            ModelState::Unavailable(_) => None,
        }
    }

    /// Failure diagnostics retained from the load attempts.
    pub fn attempts(&self) -> &[LoadAttempt] {
        match self {
            ModelState::Loaded(_) => &[],
            ModelState::Unavailable(attempts) => attempts,
        }
    }
}

/// Try each weight store in priority order and return the resulting state.
///
/// Never returns an error: failures are folded into the state itself so the
/// surrounding service can start degraded instead of aborting.
pub fn load(locations: &ModelLocations) -> ModelState {
    let mut attempts = Vec::new();

    match load_from_archive(&locations.weight_archive) {
        Ok(network) => {
            info!(
                path = %locations.weight_archive.display(),
                "Loaded model weights from archive"
            );
            return ModelState::Loaded(LoadedModel {
                source: ModelSource::Archive,
                network,
            });
        }
        Err(error) => {
            warn!(
                path = %locations.weight_archive.display(),
                %error,
                "Weight archive unusable, trying full model file"
            );
            attempts.push(LoadAttempt {
                source: ModelSource::Archive,
                path: locations.weight_archive.clone(),
                error,
            });
        }
    }

    match load_from_full_file(&locations.full_model) {
        Ok(network) => {
            info!(
                path = %locations.full_model.display(),
                "Loaded self-contained model file"
            );
            return ModelState::Loaded(LoadedModel {
                source: ModelSource::FullFile,
                network,
            });
        }
        Err(error) => {
            warn!(
                path = %locations.full_model.display(),
                %error,
                "Full model file unusable"
            );
            attempts.push(LoadAttempt {
                source: ModelSource::FullFile,
                path: locations.full_model.clone(),
                error,
            });
        }
    }

    warn!("No usable model found; serving in degraded mode until restart");
    ModelState::Unavailable(attempts)
}

fn load_from_archive(path: &Path) -> Result<Network, ModelError> {
    let tensors = read_weight_archive(path)?;
    let architecture = Architecture::classifier(INPUT_SHAPE, WeatherClass::ALL.len());
    Network::from_tensors(&architecture, tensors)
}

fn load_from_full_file(path: &Path) -> Result<Network, ModelError> {
    let file = FullModelFile::load(path)?;
    check_serving_contract(&file)?;
    file.into_network()
}

/// The full file brings its own topology, but it must still fit the serving
/// pipeline: the normalizer's output shape and the fixed class list.
fn check_serving_contract(file: &FullModelFile) -> Result<(), ModelError> {
    if file.architecture.input_shape != INPUT_SHAPE {
        return Err(ModelError::FormatMismatch {
            detail: format!(
                "model expects input shape {:?}, the service produces {INPUT_SHAPE:?}",
                file.architecture.input_shape
            ),
        });
    }
    let expected = WeatherClass::ALL.iter().map(|class| class.label());
    if !file.classes.iter().map(String::as_str).eq(expected) {
        return Err(ModelError::FormatMismatch {
            detail: format!(
                "class list {:?} does not match the serving class set",
                file.classes
            ),
        });
    }
    Ok(())
}
