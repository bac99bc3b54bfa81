//! Configuration type definitions.

use crate::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_LOG_DIR, DEFAULT_METRICS_DIR, service,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model artifact settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Default prediction settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP service settings.
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Model artifact configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the serialized model weights.
    pub path: Option<PathBuf>,

    /// Path to the species mapping JSON file.
    pub species_map: Option<PathBuf>,

    /// Version string reported alongside predictions.
    pub version: Option<String>,
}

/// Default prediction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Minimum confidence for a prediction to count as confident.
    pub confidence_threshold: f32,

    /// Directory for prediction session logs.
    pub log_dir: PathBuf,

    /// Directory for model metric logs.
    pub metrics_dir: PathBuf,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            metrics_dir: PathBuf::from(DEFAULT_METRICS_DIR),
        }
    }
}

/// HTTP service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Socket address the service binds to.
    pub bind: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: service::DEFAULT_BIND.to_string(),
        }
    }
}
