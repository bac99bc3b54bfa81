//! Training checkpoints and the final model artifact.

use crate::error::{Error, Result};
use crate::training::TrainingHistory;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Durable snapshot of training state at one epoch.
///
/// Written whenever validation loss improves; later improving epochs write
/// new files rather than replacing earlier ones. The final model file is a
/// separate weights-only artifact, see [`save_weights`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Epoch the checkpoint was taken at (1-based).
    pub epoch: usize,
    /// Serialized model weights, opaque to this crate.
    pub weights: Vec<u8>,
    /// Serialized optimizer state, opaque to this crate.
    pub optimizer_state: Vec<u8>,
    /// History up to and including this epoch.
    pub history: TrainingHistory,
}

impl Checkpoint {
    /// Write the checkpoint to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|e| Error::CheckpointWrite {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        writer.flush()?;
        info!("Checkpoint saved: {}", path.display());
        Ok(())
    }

    /// Read a checkpoint back from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::CheckpointRead {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::CheckpointRead {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }
}

/// Checkpoint file path for an epoch and its validation accuracy.
pub fn checkpoint_path(dir: &Path, epoch: usize, val_acc: f64) -> PathBuf {
    dir.join(format!("wildlife_model_epoch{epoch}_acc{val_acc:.2}.ckpt"))
}

/// Write a weights-only model artifact.
pub fn save_weights(path: &Path, weights: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, weights)?;
    info!("Model saved to {}", path.display());
    Ok(())
}
