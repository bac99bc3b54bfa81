//! Model capability interfaces and the ONNX-backed implementation.
//!
//! The neural network itself is an external capability: this crate only
//! depends on a forward pass producing per-class scores, and (for training
//! orchestration) on a gradient-step capability provided by an external
//! optimization backend.

mod onnx;
mod species;

pub use onnx::OnnxModel;
pub use species::SpeciesMap;

use crate::error::Result;
use ndarray::{Array2, Array4};

/// A loaded classification model: batches of preprocessed image tensors in,
/// per-class raw scores out.
///
/// Implementations must be safe to call from multiple threads; runtimes that
/// are not reentrant serialize internally.
pub trait ImageModel: Send + Sync {
    /// Run a forward pass over a batch of shape `(N, 3, H, W)`, returning
    /// raw class scores of shape `(N, num_classes)`.
    fn forward(&self, batch: &Array4<f32>) -> Result<Array2<f32>>;
}

/// Metrics accumulated over one batch of training or validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchMetrics {
    /// Summed loss for the batch.
    pub loss: f64,
    /// Number of correctly classified samples.
    pub correct: usize,
    /// Number of samples in the batch.
    pub total: usize,
}

/// Fine-tuning phase of a transfer-learning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainPhase {
    /// Backbone weights are frozen; only the classification head trains.
    BackboneFrozen,
    /// All weights receive gradient updates.
    FullyUnfrozen,
}

/// External optimization capability for fine-tuning.
///
/// The substance of training (forward pass, loss, backpropagation, weight
/// updates) lives behind this trait; the crate's [`Trainer`] only drives the
/// phase/epoch control flow.
///
/// [`Trainer`]: crate::training::Trainer
pub trait TrainableModel {
    /// Run one optimization step over a training batch.
    fn train_step(&mut self, images: &Array4<f32>, labels: &[usize]) -> Result<BatchMetrics>;

    /// Evaluate one batch with gradients disabled.
    fn eval_step(&mut self, images: &Array4<f32>, labels: &[usize]) -> Result<BatchMetrics>;

    /// Switch the fine-tuning phase (freeze or unfreeze the backbone).
    fn set_phase(&mut self, phase: TrainPhase);

    /// Multiply the current learning rate by `factor`.
    fn scale_learning_rate(&mut self, factor: f64);

    /// Serialize the current model weights.
    fn export_weights(&self) -> Result<Vec<u8>>;

    /// Serialize the current optimizer state.
    fn export_optimizer_state(&self) -> Result<Vec<u8>>;
}
