use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading weight stores or assigning weights.
///
/// The startup loader catches these at each fallback boundary; they never
/// propagate past it. Per-request inference surfaces them wrapped in
/// [`crate::service::PredictError`].
#[derive(Debug, Error)]
pub enum ModelError {
    /// Expected weight or model file is absent.
    #[error("Model file not found at {path}")]
    NotFound {
        /// Path that was probed.
        path: PathBuf,
    },
    /// Reading a weight store failed at the I/O level.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// A serialized artifact could not be decoded.
    #[error("Failed to decode {path}: {detail}")]
    Decode {
        /// Artifact path.
        path: PathBuf,
        /// What was malformed.
        detail: String,
    },
    /// An archive key does not follow the `<name>_<ordinal>` convention.
    #[error("Weight key '{key}' does not match the <name>_<ordinal> pattern")]
    KeyPattern {
        /// Offending key.
        key: String,
    },
    /// Tensor count or shapes disagree with the architecture.
    #[error("Weights do not fit the architecture: {detail}")]
    FormatMismatch {
        /// Which tensor or dimension disagreed.
        detail: String,
    },
}
