//! Model topology, weight stores and startup loading.
//!
//! The network topology is rebuilt from code ([`arch`]); trained parameters
//! come from either an NPZ weight archive ([`archive`]) or a self-contained
//! JSON model file ([`full`]), tried in that order by [`loader::load`]. The
//! outcome is captured once in [`ModelState`] and shared read-only for the
//! rest of the process lifetime.

pub mod arch;
pub mod archive;
mod errors;
pub mod full;
pub mod loader;
pub mod network;
mod tensor;

pub use arch::{Architecture, LayerSpec, TensorSpec, INPUT_SHAPE};
pub use archive::{read_weight_archive, write_weight_archive};
pub use errors::ModelError;
pub use full::{FullModelFile, FULL_MODEL_SCHEMA_VERSION};
pub use loader::{load, LoadAttempt, LoadedModel, ModelLocations, ModelSource, ModelState};
pub use network::{softmax, Network};
pub use tensor::WeightTensor;
