//! Prediction result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One ranked species guess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Species label.
    pub species: String,
    /// Softmax probability assigned to the label.
    pub confidence: f32,
}

/// Result of classifying a single image.
///
/// Created once per inference call and never mutated afterwards; the session
/// log stores these verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Path (or upload name) of the source image.
    pub image_path: String,
    /// Top-predicted species label.
    pub predicted_species: String,
    /// Softmax probability of the top prediction.
    pub confidence: f32,
    /// Whether `confidence` met the predictor's threshold.
    pub is_confident: bool,
    /// Ranked predictions, descending by confidence.
    pub top_predictions: Vec<Prediction>,
    /// When the prediction was made.
    pub timestamp: DateTime<Utc>,
}

/// Per-image failure captured during batch processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Path of the image that failed.
    pub image_path: String,
    /// Error message.
    pub error: String,
}

/// One entry of a batch result or session log: a prediction or a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionRecord {
    /// Successful prediction.
    Success(PredictionResult),
    /// Per-image failure.
    Failure(ErrorRecord),
}

impl PredictionRecord {
    /// Whether this record captures a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Source image path of the record.
    pub fn image_path(&self) -> &str {
        match self {
            Self::Success(result) => &result.image_path,
            Self::Failure(record) => &record.image_path,
        }
    }

    /// The successful result, if any.
    pub fn as_success(&self) -> Option<&PredictionResult> {
        match self {
            Self::Success(result) => Some(result),
            Self::Failure(_) => None,
        }
    }
}

/// Aggregate statistics over a batch of prediction records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionStats {
    /// Number of successful predictions.
    pub total_predictions: usize,
    /// Number of successful predictions that met the confidence threshold.
    pub confident_predictions: usize,
    /// `confident_predictions / total_predictions`, 0 when empty.
    pub confidence_rate: f64,
    /// Mean confidence over successful predictions, 0 when empty.
    pub average_confidence: f64,
    /// Count of successful predictions per species.
    pub species_distribution: HashMap<String, usize>,
    /// Number of failed items.
    pub errors: usize,
}
