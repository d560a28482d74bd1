//! Library exports for reuse in binaries, benchmarks and tests.
/// Application directory helpers.
pub mod app_dirs;
/// Fixed weather class set and display metadata.
pub mod classes;
/// Service configuration loading.
pub mod config;
/// Uploaded image decoding and tensor conversion.
pub mod imagery;
/// Logging setup.
pub mod logging;
/// Model topology, weight stores and startup loading.
pub mod model;
/// Prediction service facade.
pub mod service;
