//! Self-contained JSON model artifact.
//!
//! Unlike the weight archive, this file embeds its own topology, so loading
//! it needs no reconciliation against the code-built architecture. The
//! loader still checks the serving contract (input shape and class list)
//! before accepting it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::arch::Architecture;
use super::errors::ModelError;
use super::network::Network;
use super::tensor::WeightTensor;

/// Artifact schema version this build reads and writes.
pub const FULL_MODEL_SCHEMA_VERSION: i64 = 1;

/// Serialized topology plus weights, independently loadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullModelFile {
    /// Artifact schema version.
    pub schema_version: i64,
    /// Topology the weights belong to.
    pub architecture: Architecture,
    /// Ordered class labels the output layer scores.
    pub classes: Vec<String>,
    /// Parameter tensors in the architecture's expected order.
    pub tensors: Vec<WeightTensor>,
}

impl FullModelFile {
    /// Read and structurally validate an artifact.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: Self = serde_json::from_slice(&bytes).map_err(|err| ModelError::Decode {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;
        file.validate()?;
        Ok(file)
    }

    /// Write the artifact as JSON.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let bytes = serde_json::to_vec(self).map_err(|err| ModelError::Decode {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;
        std::fs::write(path, bytes).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check internal consistency without building the network yet.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.schema_version != FULL_MODEL_SCHEMA_VERSION {
            return Err(ModelError::FormatMismatch {
                detail: format!(
                    "unsupported schema_version {} (expected {FULL_MODEL_SCHEMA_VERSION})",
                    self.schema_version
                ),
            });
        }
        let classes = self.architecture.num_classes();
        if self.classes.len() != classes {
            return Err(ModelError::FormatMismatch {
                detail: format!(
                    "{} class labels for an output layer of width {classes}",
                    self.classes.len()
                ),
            });
        }
        Ok(())
    }

    /// Assign the embedded tensors into the embedded topology.
    pub fn into_network(self) -> Result<Network, ModelError> {
        Network::from_tensors(&self.architecture, self.tensors)
    }
}
