//! Plateau-based learning-rate reduction policy.

use tracing::info;

/// Learning-rate reduction on validation-loss plateau.
///
/// "Min" mode: an epoch improves only when its loss is strictly below the
/// best seen so far. `patience` non-improving epochs are tolerated; the
/// reduction fires on the next one, after which the counter resets. The
/// scheduler only decides; the caller applies the factor to the backend.
#[derive(Debug, Clone)]
pub struct PlateauScheduler {
    factor: f64,
    patience: usize,
    best: Option<f64>,
    bad_epochs: usize,
}

impl PlateauScheduler {
    /// Create a scheduler with the given reduction factor and patience.
    pub fn new(factor: f64, patience: usize) -> Self {
        Self {
            factor,
            patience,
            best: None,
            bad_epochs: 0,
        }
    }

    /// The configured reduction factor.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Observe one epoch's validation loss. Returns `true` when the
    /// learning rate should be reduced by [`factor`](Self::factor).
    pub fn step(&mut self, val_loss: f64) -> bool {
        let improved = self.best.is_none_or(|best| val_loss < best);
        if improved {
            self.best = Some(val_loss);
            self.bad_epochs = 0;
            return false;
        }

        self.bad_epochs += 1;
        if self.bad_epochs > self.patience {
            self.bad_epochs = 0;
            info!(
                "Validation loss plateaued; reducing learning rate by {}",
                self.factor
            );
            return true;
        }
        false
    }
}
