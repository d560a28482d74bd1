//! Prediction service facade: normalize → infer → compose.
//!
//! The model state is established exactly once by [`PredictionService::startup`]
//! and shared read-only behind an `Arc`; request handling never mutates it.
//! Per-request failures (bad upload, unavailable model) come back as values
//! and leave the state untouched.

use std::sync::Arc;

use ndarray::Array4;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::classes::WeatherClass;
use crate::imagery::{self, ImageDecodeError};
use crate::model::{loader, ModelError, ModelLocations, ModelSource, ModelState};

/// Errors returned to callers of [`PredictionService::predict`].
#[derive(Debug, Error)]
pub enum PredictError {
    /// The uploaded bytes were not a decodable image.
    #[error(transparent)]
    ImageDecode(#[from] ImageDecodeError),
    /// No model is loaded; the service is running degraded.
    #[error("No model is loaded; provide a weight store and restart the service")]
    ModelUnavailable,
    /// The forward pass rejected its input.
    #[error("Inference failed: {0}")]
    Inference(#[from] ModelError),
    /// The probability vector does not cover the fixed class set.
    #[error("Probability vector has {actual} entries, expected {expected}")]
    Distribution {
        /// Size of the fixed class set.
        expected: usize,
        /// Entries actually produced.
        actual: usize,
    },
}

/// Percentage score for one class of the fixed set.
#[derive(Debug, Clone, Serialize)]
pub struct ClassScore {
    /// Class label.
    pub class: String,
    /// Probability scaled to `[0, 100]`.
    pub percent: f32,
}

/// Ranked prediction for one uploaded image.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Winning class label.
    pub predicted_class: String,
    /// Winning probability scaled to `[0, 100]`.
    pub confidence: f32,
    /// Display symbol for the winning class.
    pub symbol: String,
    /// One-line description of the winning class.
    pub description: String,
    /// Per-class percentages in fixed class order, summing to 100.
    pub distribution: Vec<ClassScore>,
}

/// Which weight store format is currently present on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatOnDisk {
    /// The NPZ weight archive exists.
    Archive,
    /// Only the self-contained model file exists.
    FullFile,
    /// Neither artifact exists.
    None,
}

/// Readiness report for the surrounding service layer.
#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    /// The process is up and answering.
    pub service_healthy: bool,
    /// Whether a model loaded at startup.
    pub model_loaded: bool,
    /// Which artifact is present on disk right now.
    pub format_on_disk: FormatOnDisk,
}

/// Shared handle over the once-loaded model state.
#[derive(Debug, Clone)]
pub struct PredictionService {
    state: Arc<ModelState>,
    locations: ModelLocations,
}

impl PredictionService {
    /// Run the startup loader once and wrap the resulting state.
    pub fn startup(locations: &ModelLocations) -> Self {
        let state = loader::load(locations);
        if let Some(source) = state.source() {
            info!(source = source.as_str(), "Model ready to serve predictions");
        }
        Self::from_state(state, locations.clone())
    }

    /// Wrap an already-established state (used by tests and embedders).
    pub fn from_state(state: ModelState, locations: ModelLocations) -> Self {
        Self {
            state: Arc::new(state),
            locations,
        }
    }

    /// The immutable model state established at startup.
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    /// Classify one uploaded image.
    pub fn predict(&self, raw: &[u8]) -> Result<Prediction, PredictError> {
        let ModelState::Loaded(model) = self.state.as_ref() else {
            return Err(PredictError::ModelUnavailable);
        };
        let tensor = imagery::normalize(raw)?;
        let probabilities = model.network.forward(&tensor)?;
        compose(&probabilities)
    }

    /// Run the forward pass over an already-normalized tensor.
    pub fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>, PredictError> {
        match self.state.as_ref() {
            ModelState::Loaded(model) => Ok(model.network.forward(input)?),
            ModelState::Unavailable(_) => Err(PredictError::ModelUnavailable),
        }
    }

    /// Report service and model readiness.
    pub fn readiness(&self) -> Readiness {
        Readiness {
            service_healthy: true,
            model_loaded: self.state.is_loaded(),
            format_on_disk: format_on_disk(&self.locations),
        }
    }

    /// Source format of the loaded model, if one loaded.
    pub fn model_source(&self) -> Option<ModelSource> {
        self.state.source()
    }
}

/// Turn a probability vector into the ranked, percentage-scaled result.
///
/// Ties are broken deterministically toward the lowest class index. The
/// class set is closed, so the only dynamic invariant is the vector length.
pub fn compose(probabilities: &[f32]) -> Result<Prediction, PredictError> {
    let classes = WeatherClass::ALL;
    if probabilities.len() != classes.len() {
        return Err(PredictError::Distribution {
            expected: classes.len(),
            actual: probabilities.len(),
        });
    }
    let mut winner = 0usize;
    let mut best = probabilities[0];
    for (index, &probability) in probabilities.iter().enumerate() {
        if probability > best {
            best = probability;
            winner = index;
        }
    }
    let winning_class = classes[winner];
    let distribution = classes
        .iter()
        .zip(probabilities)
        .map(|(class, &probability)| ClassScore {
            class: class.label().to_string(),
            percent: probability * 100.0,
        })
        .collect();
    Ok(Prediction {
        predicted_class: winning_class.label().to_string(),
        confidence: best * 100.0,
        symbol: winning_class.symbol().to_string(),
        description: winning_class.description().to_string(),
        distribution,
    })
}

fn format_on_disk(locations: &ModelLocations) -> FormatOnDisk {
    if locations.weight_archive.exists() {
        FormatOnDisk::Archive
    } else if locations.full_model.exists() {
        FormatOnDisk::FullFile
    } else {
        FormatOnDisk::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_picks_the_highest_probability() {
        let prediction = compose(&[0.1, 0.1, 0.1, 0.1, 0.6]).expect("compose");
        assert_eq!(prediction.predicted_class, "snow");
        assert!((prediction.confidence - 60.0).abs() < 1e-4);
        let total: f32 = prediction
            .distribution
            .iter()
            .map(|score| score.percent)
            .sum();
        assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn compose_breaks_ties_toward_the_lowest_index() {
        let prediction = compose(&[0.2, 0.2, 0.2, 0.2, 0.2]).expect("compose");
        assert_eq!(prediction.predicted_class, "hail");
        assert!((prediction.confidence - 20.0).abs() < 1e-4);
    }

    #[test]
    fn compose_keeps_the_fixed_class_order() {
        let prediction = compose(&[0.5, 0.2, 0.1, 0.1, 0.1]).expect("compose");
        let labels: Vec<&str> = prediction
            .distribution
            .iter()
            .map(|score| score.class.as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["hail", "lightning", "rain", "sandstorm", "snow"]
        );
        assert_eq!(prediction.symbol, WeatherClass::Hail.symbol());
        assert_eq!(prediction.description, WeatherClass::Hail.description());
    }

    #[test]
    fn compose_rejects_a_vector_of_the_wrong_length() {
        let err = compose(&[0.5, 0.5]).unwrap_err();
        match err {
            PredictError::Distribution { expected, actual } => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn prediction_serializes_with_stable_field_names() {
        let prediction = compose(&[0.1, 0.1, 0.1, 0.1, 0.6]).expect("compose");
        let json = serde_json::to_value(&prediction).expect("serialize prediction");
        assert_eq!(json["predicted_class"], "snow");
        assert!(json["distribution"].as_array().is_some_and(|d| d.len() == 5));
    }
}
