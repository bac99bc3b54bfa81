//! Deterministic image-to-tensor transform.

use crate::constants::{input, normalization};
use crate::error::{Error, Result};
use image::RgbImage;
use image::imageops::FilterType;
use ndarray::{Array3, Array4};
use std::path::Path;

/// Transform chain from a raw image to a normalized `(3, 224, 224)` tensor.
///
/// The order is fixed and must be identical for inference and training:
/// decode to RGB, resize to 224x224 (no aspect-preserving crop), scale to
/// [0, 1], then per-channel normalize. The training variant applies
/// randomized augmentation between resize and normalization; augmentation is
/// never applied at inference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTransform {
    /// Deterministic chain only.
    Inference,
    /// Deterministic chain plus randomized augmentation.
    Training,
}

impl ImageTransform {
    /// Decode and transform an image file.
    pub fn prepare_path(self, path: &Path) -> Result<Array3<f32>> {
        let decoded = image::open(path).map_err(|e| Error::Decode {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(self.apply(decoded.to_rgb8()))
    }

    /// Decode and transform an in-memory image (e.g. an HTTP upload).
    ///
    /// `name` only labels the error when decoding fails.
    pub fn prepare_bytes(self, name: &str, bytes: &[u8]) -> Result<Array3<f32>> {
        let decoded = image::load_from_memory(bytes).map_err(|e| Error::Decode {
            path: name.into(),
            source: e,
        })?;
        Ok(self.apply(decoded.to_rgb8()))
    }

    /// Transform an already decoded RGB image.
    pub fn apply(self, rgb: RgbImage) -> Array3<f32> {
        #[allow(clippy::cast_possible_truncation)]
        let mut resized = image::imageops::resize(
            &rgb,
            input::WIDTH as u32,
            input::HEIGHT as u32,
            FilterType::Triangle,
        );

        if self == Self::Training {
            resized = super::augment(resized);
        }

        tensorize(&resized)
    }
}

/// Scale a resized RGB image to [0, 1] and normalize per channel into CHW.
fn tensorize(rgb: &RgbImage) -> Array3<f32> {
    let mut tensor = Array3::<f32>::zeros((input::CHANNELS, input::HEIGHT, input::WIDTH));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for channel in 0..input::CHANNELS {
            let value = f32::from(pixel.0[channel]) / 255.0;
            tensor[[channel, y, x]] =
                (value - normalization::MEAN[channel]) / normalization::STD[channel];
        }
    }

    tensor
}

/// Stack prepared image tensors into a `(N, 3, H, W)` batch.
pub fn stack_batch(items: &[Array3<f32>]) -> Array4<f32> {
    let mut batch = Array4::<f32>::zeros((items.len(), input::CHANNELS, input::HEIGHT, input::WIDTH));
    for (i, item) in items.iter().enumerate() {
        batch
            .index_axis_mut(ndarray::Axis(0), i)
            .assign(item);
    }
    batch
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_prepare_output_shape() {
        let img = RgbImage::from_pixel(64, 48, Rgb([128, 64, 200]));
        let tensor = ImageTransform::Inference.apply(img);
        assert_eq!(tensor.shape(), &[3, 224, 224]);
    }

    #[test]
    fn test_normalization_values() {
        // A uniform white image resizes to itself, so every output value is
        // (1.0 - mean) / std for its channel.
        let img = RgbImage::from_pixel(224, 224, Rgb([255, 255, 255]));
        let tensor = ImageTransform::Inference.apply(img);

        for channel in 0..3 {
            let expected =
                (1.0 - normalization::MEAN[channel]) / normalization::STD[channel];
            let got = tensor[[channel, 100, 100]];
            assert!(
                (got - expected).abs() < 1e-5,
                "channel {channel}: {got} != {expected}"
            );
        }
    }

    #[test]
    fn test_prepare_path_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let result = ImageTransform::Inference.prepare_path(&path);
        assert!(matches!(result, Err(crate::error::Error::Decode { .. })));
    }

    #[test]
    fn test_stack_batch_shape() {
        let img = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let a = ImageTransform::Inference.apply(img.clone());
        let b = ImageTransform::Inference.apply(img);
        let batch = stack_batch(&[a, b]);
        assert_eq!(batch.shape(), &[2, 3, 224, 224]);
    }
}
