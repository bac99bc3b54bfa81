//! Labeled image dataset loading for training and validation.

use crate::constants::input;
use crate::error::{Error, Result};
use crate::model::SpeciesMap;
use crate::preprocess::{ImageTransform, stack_batch};
use ndarray::{Array3, Array4};
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One batch of preprocessed images with their class labels.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Image tensors, shape `(N, 3, H, W)`.
    pub images: Array4<f32>,
    /// Class label per image.
    pub labels: Vec<usize>,
}

/// Source of training or validation batches for one epoch.
pub trait BatchProvider {
    /// Iterate the batches of one full pass.
    fn iter_batches(&self) -> Box<dyn Iterator<Item = Result<Batch>> + '_>;

    /// Number of batches per pass.
    fn num_batches(&self) -> usize;
}

/// Dataset rooted at a directory of per-species subdirectories.
///
/// Layout: `<root>/<species_label>/**.jpg` (and the other supported image
/// extensions). Labels come from the species mapping; a species directory
/// that does not exist is skipped with a warning.
pub struct ImageFolderDataset {
    samples: Vec<(PathBuf, usize)>,
    transform: ImageTransform,
}

impl ImageFolderDataset {
    /// Scan `root` for images belonging to the mapped species.
    pub fn from_directory(
        root: &Path,
        species: &SpeciesMap,
        transform: ImageTransform,
    ) -> Result<Self> {
        let mut samples = Vec::new();

        for (class_idx, label) in species.labels().iter().enumerate() {
            let species_dir = root.join(label);
            if !species_dir.is_dir() {
                warn!("Species directory not found: {}", species_dir.display());
                continue;
            }
            let files = crate::inference::collect_image_files(&species_dir, true)?;
            samples.extend(files.into_iter().map(|path| (path, class_idx)));
        }

        if samples.is_empty() {
            return Err(Error::EmptyDataset {
                path: root.to_path_buf(),
            });
        }

        Ok(Self { samples, transform })
    }

    /// Number of samples in the dataset.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the dataset holds no samples. Never true once constructed.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Batch loader over this dataset.
    pub fn loader(&self, batch_size: usize, shuffle: bool) -> ImageFolderLoader<'_> {
        ImageFolderLoader {
            dataset: self,
            batch_size: batch_size.max(1),
            shuffle,
        }
    }

    /// Load one sample, falling back to a blank tensor when the image is
    /// unreadable so a single corrupt file does not abort an epoch.
    fn load_sample(&self, path: &Path) -> Array3<f32> {
        match self.transform.prepare_path(path) {
            Ok(tensor) => tensor,
            Err(e) => {
                warn!("Error loading image {}: {}", path.display(), e);
                Array3::zeros((input::CHANNELS, input::HEIGHT, input::WIDTH))
            }
        }
    }
}

/// Epoch-wise batch iterator over an [`ImageFolderDataset`].
pub struct ImageFolderLoader<'a> {
    dataset: &'a ImageFolderDataset,
    batch_size: usize,
    shuffle: bool,
}

impl BatchProvider for ImageFolderLoader<'_> {
    fn iter_batches(&self) -> Box<dyn Iterator<Item = Result<Batch>> + '_> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            order.shuffle(&mut rand::rng());
        }

        let batch_size = self.batch_size;
        let num_batches = self.num_batches();
        Box::new((0..num_batches).map(move |b| {
            let start = b * batch_size;
            let end = (start + batch_size).min(order.len());
            let chunk = &order[start..end];

            let mut tensors = Vec::with_capacity(chunk.len());
            let mut labels = Vec::with_capacity(chunk.len());
            for &idx in chunk {
                let (path, label) = &self.dataset.samples[idx];
                tensors.push(self.dataset.load_sample(path));
                labels.push(*label);
            }
            Ok(Batch {
                images: stack_batch(&tensors),
                labels,
            })
        }))
    }

    fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }
}
