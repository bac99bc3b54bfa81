//! Randomized training-time augmentation.

use crate::constants::augment as params;
use image::{Rgb, RgbImage};
use rand::Rng;

/// Apply the randomized training augmentations to a resized image.
///
/// Applied between resize and normalization: horizontal flip, vertical
/// flip, rotation within +/-15 degrees, and brightness/contrast/saturation
/// jitter of up to 20% each.
pub fn augment(mut img: RgbImage) -> RgbImage {
    let mut rng = rand::rng();

    if rng.random_bool(params::HORIZONTAL_FLIP_P) {
        image::imageops::flip_horizontal_in_place(&mut img);
    }
    if rng.random_bool(params::VERTICAL_FLIP_P) {
        image::imageops::flip_vertical_in_place(&mut img);
    }

    let angle = rng.random_range(-params::ROTATION_DEGREES..=params::ROTATION_DEGREES);
    if angle.abs() > f32::EPSILON {
        img = rotate(&img, angle.to_radians());
    }

    let brightness = jitter_factor(&mut rng);
    let contrast = jitter_factor(&mut rng);
    let saturation = jitter_factor(&mut rng);
    color_jitter(&mut img, brightness, contrast, saturation);

    img
}

/// Random factor in `[1 - COLOR_JITTER, 1 + COLOR_JITTER]`.
fn jitter_factor<R: Rng>(rng: &mut R) -> f32 {
    rng.random_range(1.0 - params::COLOR_JITTER..=1.0 + params::COLOR_JITTER)
}

/// Rotate around the image center with nearest-neighbor sampling.
///
/// Pixels rotated in from outside the frame are black, matching the
/// zero-fill behavior the model was trained against.
fn rotate(img: &RgbImage, radians: f32) -> RgbImage {
    let (width, height) = img.dimensions();
    #[allow(clippy::cast_precision_loss)]
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let (sin, cos) = radians.sin_cos();

    let mut out = RgbImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        // Inverse mapping: where in the source does this output pixel come from?
        #[allow(clippy::cast_precision_loss)]
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        let sx = cos.mul_add(dx, sin * dy) + cx;
        let sy = (-sin).mul_add(dx, cos * dy) + cy;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        if sx >= 0.0 && sy >= 0.0 && (sx as u32) < width && (sy as u32) < height {
            *pixel = *img.get_pixel(sx as u32, sy as u32);
        }
    }
    out
}

/// In-place brightness, contrast and saturation scaling.
fn color_jitter(img: &mut RgbImage, brightness: f32, contrast: f32, saturation: f32) {
    // Mean luminance drives the contrast pivot, as in the reference
    // transform stack.
    let mut sum = 0.0f64;
    for pixel in img.pixels() {
        sum += f64::from(luminance(pixel));
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = (sum / f64::from(img.width() * img.height())) as f32;

    for pixel in img.pixels_mut() {
        let gray = luminance(pixel);
        for channel in 0..3 {
            let mut value = f32::from(pixel.0[channel]);
            value *= brightness;
            value = contrast.mul_add(value - mean, mean);
            value = saturation.mul_add(value - gray, gray);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                pixel.0[channel] = value.clamp(0.0, 255.0) as u8;
            }
        }
    }
}

fn luminance(pixel: &Rgb<u8>) -> f32 {
    0.114f32.mul_add(
        f32::from(pixel.0[2]),
        0.299f32.mul_add(f32::from(pixel.0[0]), 0.587 * f32::from(pixel.0[1])),
    )
}
