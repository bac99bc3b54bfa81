//! Inference pipeline: predictor and prediction result types.

mod predictor;
mod types;

pub use predictor::{Predictor, collect_image_files, softmax};
pub use types::{ErrorRecord, Prediction, PredictionRecord, PredictionResult, PredictionStats};
