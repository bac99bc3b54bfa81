//! Species predictor over a loaded classification model.

use crate::constants::{IMAGE_EXTENSIONS, TOP_K};
use crate::error::{Error, Result};
use crate::inference::{ErrorRecord, Prediction, PredictionRecord, PredictionResult, PredictionStats};
use crate::model::{ImageModel, OnnxModel, SpeciesMap};
use crate::preprocess::{ImageTransform, stack_batch};
use chrono::Utc;
use ndarray::Array3;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Inference predictor for wildlife species classification.
///
/// Constructed unloaded; [`load_model`](Self::load_model) transitions it to
/// loaded exactly once (further calls are no-ops, and there is no unload).
/// Prediction calls are read-only once loaded.
pub struct Predictor {
    model_path: PathBuf,
    species: SpeciesMap,
    threshold: f32,
    model: Option<Box<dyn ImageModel>>,
}

impl Predictor {
    /// Create an unloaded predictor.
    ///
    /// `threshold` is the fixed confidence cutoff for `is_confident`.
    pub fn new(model_path: PathBuf, species: SpeciesMap, threshold: f32) -> Self {
        Self {
            model_path,
            species,
            threshold,
            model: None,
        }
    }

    /// Load model weights from the configured path.
    ///
    /// Idempotent: a second call on a loaded predictor does nothing. Run
    /// this at startup, before prediction traffic begins.
    pub fn load_model(&mut self) -> Result<()> {
        if self.model.is_some() {
            return Ok(());
        }
        let model = OnnxModel::load(&self.model_path)?;
        self.model = Some(Box::new(model));
        Ok(())
    }

    /// Install an already constructed model backend.
    ///
    /// Same one-way transition as [`load_model`](Self::load_model): ignored
    /// if a model is already loaded.
    pub fn attach_model(&mut self, model: Box<dyn ImageModel>) {
        if self.model.is_none() {
            self.model = Some(model);
        }
    }

    /// Whether the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// The species mapping this predictor classifies over.
    pub fn species(&self) -> &SpeciesMap {
        &self.species
    }

    /// The configured confidence threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Predict the species in a single image file.
    pub fn predict_single(&self, image_path: &Path) -> Result<PredictionResult> {
        let tensor = ImageTransform::Inference.prepare_path(image_path)?;
        self.predict_tensor(image_path.display().to_string(), tensor)
    }

    /// Predict the species in an in-memory image (e.g. an HTTP upload).
    pub fn predict_bytes(&self, name: &str, bytes: &[u8]) -> Result<PredictionResult> {
        let tensor = ImageTransform::Inference.prepare_bytes(name, bytes)?;
        self.predict_tensor(name.to_string(), tensor)
    }

    fn predict_tensor(&self, source: String, tensor: Array3<f32>) -> Result<PredictionResult> {
        let model = self.model.as_deref().ok_or(Error::ModelNotLoaded)?;

        let batch = stack_batch(&[tensor]);
        let scores = model.forward(&batch)?;

        let num_classes = scores.shape()[1];
        if num_classes != self.species.len() {
            return Err(Error::Inference {
                reason: format!(
                    "model produced {num_classes} classes but species mapping has {}",
                    self.species.len()
                ),
            });
        }

        let row: Vec<f32> = scores.row(0).to_vec();
        let probabilities = softmax(&row);

        // Arg-max with ties resolved toward the lower class index.
        let (predicted_idx, &confidence) = probabilities
            .iter()
            .enumerate()
            .max_by(|(i, a), (j, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal).then(j.cmp(i)))
            .ok_or_else(|| Error::Inference {
                reason: "model produced an empty score vector".to_string(),
            })?;

        let predicted_species = self
            .species
            .label(predicted_idx)
            .ok_or_else(|| Error::Inference {
                reason: format!("class index {predicted_idx} outside species mapping"),
            })?
            .to_string();

        let top_predictions = self.top_k(&probabilities);

        debug!(
            "Predicted {} ({:.4}) for {}",
            predicted_species, confidence, source
        );

        Ok(PredictionResult {
            image_path: source,
            predicted_species,
            confidence,
            is_confident: confidence >= self.threshold,
            top_predictions,
            timestamp: Utc::now(),
        })
    }

    /// Top `min(3, N)` predictions, descending, ties toward lower index.
    fn top_k(&self, probabilities: &[f32]) -> Vec<Prediction> {
        let mut ranked: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
        ranked.sort_by(|(i, a), (j, b)| {
            b.partial_cmp(a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(i.cmp(j))
        });

        ranked
            .into_iter()
            .take(TOP_K.min(self.species.len()))
            .filter_map(|(index, confidence)| {
                self.species.label(index).map(|label| Prediction {
                    species: label.to_string(),
                    confidence,
                })
            })
            .collect()
    }

    /// Predict species for multiple images.
    ///
    /// A failing image yields an error record in its position; the rest of
    /// the batch still runs.
    pub fn predict_batch(&self, image_paths: &[PathBuf]) -> Vec<PredictionRecord> {
        image_paths
            .iter()
            .map(|path| match self.predict_single(path) {
                Ok(result) => PredictionRecord::Success(result),
                Err(e) => {
                    warn!("Failed to predict {}: {}", path.display(), e);
                    PredictionRecord::Failure(ErrorRecord {
                        image_path: path.display().to_string(),
                        error: e.to_string(),
                    })
                }
            })
            .collect()
    }

    /// Predict species for all images under a directory.
    pub fn predict_directory(
        &self,
        directory: &Path,
        recursive: bool,
    ) -> Result<Vec<PredictionRecord>> {
        let files = collect_image_files(directory, recursive)?;
        Ok(self.predict_batch(&files))
    }

    /// Aggregate statistics over a batch of prediction records.
    pub fn prediction_statistics(records: &[PredictionRecord]) -> PredictionStats {
        let mut stats = PredictionStats::default();
        let mut total_confidence = 0.0f64;

        for result in records.iter().filter_map(PredictionRecord::as_success) {
            stats.total_predictions += 1;
            if result.is_confident {
                stats.confident_predictions += 1;
            }
            total_confidence += f64::from(result.confidence);
            *stats
                .species_distribution
                .entry(result.predicted_species.clone())
                .or_insert(0) += 1;
        }

        stats.errors = records.len() - stats.total_predictions;
        if stats.total_predictions > 0 {
            #[allow(clippy::cast_precision_loss)]
            let total = stats.total_predictions as f64;
            stats.confidence_rate = stats.confident_predictions as f64 / total;
            stats.average_confidence = total_confidence / total;
        }

        stats
    }
}

/// Numerically stable softmax: subtract the max logit before exponentiating.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Enumerate image files under a directory in filesystem order.
pub fn collect_image_files(directory: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_into(directory, recursive, &mut files)?;
    Ok(files)
}

fn collect_into(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if recursive {
                collect_into(&path, recursive, files)?;
            }
        } else if is_image_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Check if a file has a supported image extension.
fn is_image_file(path: &Path) -> bool {
    use std::ffi::OsStr;

    path.extension().is_some_and(|ext| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|valid| ext.eq_ignore_ascii_case(OsStr::new(valid)))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::model::ImageModel;
    use ndarray::{Array2, Array4};

    /// Model returning the same fixed score row for every input.
    struct FixedScores(Vec<f32>);

    impl ImageModel for FixedScores {
        fn forward(&self, batch: &Array4<f32>) -> Result<Array2<f32>> {
            let n = batch.shape()[0];
            let mut out = Array2::zeros((n, self.0.len()));
            for mut row in out.rows_mut() {
                for (slot, score) in row.iter_mut().zip(&self.0) {
                    *slot = *score;
                }
            }
            Ok(out)
        }
    }

    fn three_species_predictor(scores: Vec<f32>, threshold: f32) -> Predictor {
        let species = SpeciesMap::from_labels(vec![
            "Lion".to_string(),
            "Elephant".to_string(),
            "Zebra".to_string(),
        ])
        .unwrap();
        let mut predictor = Predictor::new(PathBuf::from("unused.onnx"), species, threshold);
        predictor.attach_model(Box::new(FixedScores(scores)));
        predictor
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[5.0, 1.0, 0.1]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_softmax_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_predict_unloaded_fails() {
        let species = SpeciesMap::from_labels(vec!["Lion".to_string()]).unwrap();
        let predictor = Predictor::new(PathBuf::from("missing.onnx"), species, 0.5);
        let result = predictor.predict_bytes("x.jpg", &[]);
        // Decode runs before the model; hand it a real image to reach the
        // loaded-state check.
        assert!(result.is_err());

        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        let result = predictor.predict_bytes("x.png", &bytes);
        assert!(matches!(result, Err(Error::ModelNotLoaded)));
    }

    #[test]
    fn test_predict_ranks_species() {
        let predictor = three_species_predictor(vec![5.0, 1.0, 0.1], 0.5);

        let img = image::RgbImage::from_pixel(16, 16, image::Rgb([100, 100, 100]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let result = predictor.predict_bytes("lion.png", &bytes).unwrap();
        assert_eq!(result.predicted_species, "Lion");
        assert!(result.is_confident);
        let order: Vec<&str> = result
            .top_predictions
            .iter()
            .map(|p| p.species.as_str())
            .collect();
        assert_eq!(order, vec!["Lion", "Elephant", "Zebra"]);
        assert_eq!(result.confidence, result.top_predictions[0].confidence);
    }

    #[test]
    fn test_top_k_tie_breaks_toward_lower_index() {
        let predictor = three_species_predictor(vec![1.0, 2.0, 2.0], 0.9);
        let probs = softmax(&[1.0, 2.0, 2.0]);
        let top = predictor.top_k(&probs);
        // Elephant (index 1) ranks ahead of Zebra (index 2) on equal scores.
        assert_eq!(top[0].species, "Elephant");
        assert_eq!(top[1].species, "Zebra");
        assert_eq!(top[2].species, "Lion");
    }

    #[test]
    fn test_statistics_empty_input() {
        let stats = Predictor::prediction_statistics(&[]);
        assert_eq!(stats.total_predictions, 0);
        assert_eq!(stats.confidence_rate, 0.0);
        assert_eq!(stats.average_confidence, 0.0);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn test_statistics_counts_errors() {
        let records = vec![PredictionRecord::Failure(ErrorRecord {
            image_path: "bad.jpg".to_string(),
            error: "failed to decode".to_string(),
        })];
        let stats = Predictor::prediction_statistics(&records);
        assert_eq!(stats.total_predictions, 0);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("photo.jpg")));
        assert!(is_image_file(Path::new("photo.JPEG")));
        assert!(is_image_file(Path::new("photo.Png")));
        assert!(is_image_file(Path::new("photo.bmp")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("archive.tar")));
    }
}
