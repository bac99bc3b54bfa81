//! Two-phase fine-tuning orchestration around an external optimization
//! backend.

mod checkpoint;
mod dataset;
mod scheduler;
mod trainer;

pub use checkpoint::{Checkpoint, checkpoint_path, save_weights};
pub use dataset::{Batch, BatchProvider, ImageFolderDataset, ImageFolderLoader};
pub use scheduler::PlateauScheduler;
pub use trainer::{FitOptions, Trainer, TrainingHistory};
