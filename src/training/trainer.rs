//! Two-phase fine-tuning orchestration.

use crate::constants::training as defaults;
use crate::error::Result;
use crate::model::{BatchMetrics, TrainPhase, TrainableModel};
use crate::training::checkpoint::{Checkpoint, checkpoint_path};
use crate::training::dataset::BatchProvider;
use crate::training::scheduler::PlateauScheduler;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Per-epoch metric series for one training run.
///
/// The four vectors grow in lockstep, one entry per completed epoch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Mean training loss per epoch.
    pub train_loss: Vec<f64>,
    /// Training accuracy per epoch, in percent.
    pub train_acc: Vec<f64>,
    /// Mean validation loss per epoch.
    pub val_loss: Vec<f64>,
    /// Validation accuracy per epoch, in percent.
    pub val_acc: Vec<f64>,
}

impl TrainingHistory {
    /// Append one epoch's metrics.
    pub fn push_epoch(&mut self, train_loss: f64, train_acc: f64, val_loss: f64, val_acc: f64) {
        self.train_loss.push(train_loss);
        self.train_acc.push(train_acc);
        self.val_loss.push(val_loss);
        self.val_acc.push(val_acc);
    }

    /// Number of completed epochs.
    pub fn len(&self) -> usize {
        self.val_loss.len()
    }

    /// Whether any epoch has completed.
    pub fn is_empty(&self) -> bool {
        self.val_loss.is_empty()
    }

    /// Best (maximum) validation accuracy seen, if any epochs completed.
    pub fn best_val_acc(&self) -> Option<f64> {
        self.val_acc.iter().copied().fold(None, |best, acc| {
            Some(best.map_or(acc, |b: f64| b.max(acc)))
        })
    }
}

/// Options for one call to [`Trainer::fit`].
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Number of epochs to train, barring early stop.
    pub epochs: usize,
    /// Whether to start with the backbone frozen.
    pub freeze_backbone: bool,
    /// Epoch (1-based) at which the backbone unfreezes.
    pub unfreeze_at_epoch: usize,
    /// Directory checkpoints are written into.
    pub checkpoint_dir: PathBuf,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs: defaults::DEFAULT_EPOCHS,
            freeze_backbone: true,
            unfreeze_at_epoch: defaults::DEFAULT_UNFREEZE_EPOCH,
            checkpoint_dir: PathBuf::from("models/checkpoints"),
        }
    }
}

/// Drives the epoch/phase control flow of a fine-tuning run.
///
/// The optimization substance (forward, loss, gradients) lives in the
/// [`TrainableModel`] backend; the trainer owns the two-phase state machine,
/// history, plateau policy and early stopping.
pub struct Trainer<M: TrainableModel> {
    model: M,
    scheduler: PlateauScheduler,
    history: TrainingHistory,
}

impl<M: TrainableModel> Trainer<M> {
    /// Create a trainer around an optimization backend.
    pub fn new(model: M) -> Self {
        Self {
            model,
            scheduler: PlateauScheduler::new(
                defaults::LR_PLATEAU_FACTOR,
                defaults::LR_PLATEAU_PATIENCE,
            ),
            history: TrainingHistory::default(),
        }
    }

    /// History accumulated so far.
    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// Consume the trainer, returning the backend.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Train for up to `options.epochs` epochs.
    ///
    /// Starts in [`TrainPhase::BackboneFrozen`] when requested and switches
    /// to [`TrainPhase::FullyUnfrozen`] exactly once, at the start of the
    /// configured unfreeze epoch. Stops early after five epochs without
    /// validation-loss improvement. Returns the accumulated history.
    pub fn fit(
        &mut self,
        train: &dyn BatchProvider,
        val: &dyn BatchProvider,
        options: &FitOptions,
    ) -> Result<&TrainingHistory> {
        let mut phase = if options.freeze_backbone {
            TrainPhase::BackboneFrozen
        } else {
            TrainPhase::FullyUnfrozen
        };
        self.model.set_phase(phase);
        if phase == TrainPhase::BackboneFrozen {
            info!("Backbone frozen - fine-tuning head layers only");
        }

        let mut best_val_loss = f64::INFINITY;
        let mut epochs_without_improvement = 0usize;

        for epoch in 1..=options.epochs {
            if phase == TrainPhase::BackboneFrozen && epoch == options.unfreeze_at_epoch {
                phase = TrainPhase::FullyUnfrozen;
                self.model.set_phase(phase);
                info!("Backbone unfrozen - fine-tuning all layers");
            }

            let (train_loss, train_acc) = self.run_epoch(train, true)?;
            let (val_loss, val_acc) = self.run_epoch(val, false)?;
            self.history
                .push_epoch(train_loss, train_acc, val_loss, val_acc);

            info!(
                "Epoch {}/{}: train loss {:.4}, train acc {:.2}%, val loss {:.4}, val acc {:.2}%",
                epoch, options.epochs, train_loss, train_acc, val_loss, val_acc
            );

            if self.scheduler.step(val_loss) {
                self.model.scale_learning_rate(self.scheduler.factor());
            }

            if val_loss < best_val_loss {
                best_val_loss = val_loss;
                epochs_without_improvement = 0;
                self.save_checkpoint(epoch, val_acc, &options.checkpoint_dir)?;
            } else {
                epochs_without_improvement += 1;
                if epochs_without_improvement >= defaults::EARLY_STOP_PATIENCE {
                    info!("Early stopping at epoch {epoch}");
                    break;
                }
            }
        }

        Ok(&self.history)
    }

    /// One full pass over the provider, training or evaluating.
    fn run_epoch(&mut self, provider: &dyn BatchProvider, train: bool) -> Result<(f64, f64)> {
        let mut total_loss = 0.0f64;
        let mut correct = 0usize;
        let mut total = 0usize;
        let mut batches = 0usize;

        for batch in provider.iter_batches() {
            let batch = batch?;
            let BatchMetrics {
                loss,
                correct: batch_correct,
                total: batch_total,
            } = if train {
                self.model.train_step(&batch.images, &batch.labels)?
            } else {
                self.model.eval_step(&batch.images, &batch.labels)?
            };

            total_loss += loss;
            correct += batch_correct;
            total += batch_total;
            batches += 1;
        }

        #[allow(clippy::cast_precision_loss)]
        let avg_loss = if batches > 0 {
            total_loss / batches as f64
        } else {
            0.0
        };
        #[allow(clippy::cast_precision_loss)]
        let accuracy = if total > 0 {
            100.0 * correct as f64 / total as f64
        } else {
            0.0
        };

        Ok((avg_loss, accuracy))
    }

    /// Write a checkpoint of the current training state.
    fn save_checkpoint(&self, epoch: usize, val_acc: f64, dir: &std::path::Path) -> Result<()> {
        let checkpoint = Checkpoint {
            epoch,
            weights: self.model.export_weights()?,
            optimizer_state: self.model.export_optimizer_state()?,
            history: self.history.clone(),
        };
        checkpoint.save(&checkpoint_path(dir, epoch, val_acc))
    }

    /// Write the final weights-only model artifact.
    ///
    /// A distinct action from checkpointing, run explicitly after the
    /// training loop ends or stops early.
    pub fn save_model(&self, path: &std::path::Path) -> Result<()> {
        crate::training::checkpoint::save_weights(path, &self.model.export_weights()?)
    }
}
