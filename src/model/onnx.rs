//! ONNX Runtime model backend.

use crate::error::{Error, Result};
use crate::model::ImageModel;
use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Classification model backed by an ONNX Runtime session.
///
/// `Session::run` requires exclusive access, so the session sits behind a
/// mutex and concurrent forward passes serialize on it.
pub struct OnnxModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    path: PathBuf,
}

impl OnnxModel {
    /// Load model weights from an ONNX file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let session = Session::builder()
            .and_then(|mut b| b.commit_from_file(path))
            .map_err(|e| Error::ModelLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| Error::ModelLoad {
                path: path.to_path_buf(),
                reason: "model has no inputs".to_string(),
            })?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| Error::ModelLoad {
                path: path.to_path_buf(),
                reason: "model has no outputs".to_string(),
            })?;

        debug!(
            "ONNX session ready: input '{}', output '{}'",
            input_name, output_name
        );
        info!("Model loaded from {}", path.display());

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            path: path.to_path_buf(),
        })
    }

    /// Path the weights were loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageModel for OnnxModel {
    fn forward(&self, batch: &Array4<f32>) -> Result<Array2<f32>> {
        let batch_size = batch.shape()[0];

        let input_tensor =
            TensorRef::from_array_view(batch.view()).map_err(|e| Error::Inference {
                reason: format!("failed to convert input tensor: {e}"),
            })?;
        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let mut session = self.session.lock().map_err(|_| Error::Inference {
            reason: "model session lock poisoned".to_string(),
        })?;

        let outputs = session.run(inputs).map_err(|e| Error::Inference {
            reason: format!("forward pass failed: {e}"),
        })?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Inference {
                reason: format!("failed to extract output tensor as f32: {e}"),
            })?;

        if shape.len() != 2 {
            return Err(Error::Inference {
                reason: format!("expected 2D class-score output, got shape {shape:?}"),
            });
        }

        #[allow(clippy::cast_sign_loss)]
        let num_classes = shape[1] as usize;
        let view = ndarray::ArrayView2::from_shape((batch_size, num_classes), data)
            .map_err(|e| Error::Inference {
                reason: format!("output shape mismatch: {e}"),
            })?;

        Ok(view.to_owned())
    }
}
