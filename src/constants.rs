//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "wildeye";

/// Default minimum confidence threshold for a prediction to count as confident.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Number of top predictions returned per image.
pub const TOP_K: usize = 3;

/// Default directory for prediction session logs.
pub const DEFAULT_LOG_DIR: &str = "data/predictions_log";

/// Default directory for model metric logs.
pub const DEFAULT_METRICS_DIR: &str = "data/metrics";

/// File name of the append-only metrics log inside the metrics directory.
pub const METRICS_LOG_FILENAME: &str = "metrics_log.jsonl";

/// Image file extensions accepted for prediction, lower-case.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Model input geometry.
pub mod input {
    /// Number of color channels fed to the model.
    pub const CHANNELS: usize = 3;
    /// Input height in pixels.
    pub const HEIGHT: usize = 224;
    /// Input width in pixels.
    pub const WIDTH: usize = 224;
}

/// Per-channel normalization applied after scaling pixels to [0, 1].
///
/// These are the ImageNet statistics the pretrained backbone was trained
/// with; inference and training must use identical values.
pub mod normalization {
    /// Channel means (RGB).
    pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
    /// Channel standard deviations (RGB).
    pub const STD: [f32; 3] = [0.229, 0.224, 0.225];
}

/// Training-time augmentation parameters.
pub mod augment {
    /// Probability of a horizontal flip.
    pub const HORIZONTAL_FLIP_P: f64 = 0.5;
    /// Probability of a vertical flip.
    pub const VERTICAL_FLIP_P: f64 = 0.1;
    /// Maximum rotation in degrees, either direction.
    pub const ROTATION_DEGREES: f32 = 15.0;
    /// Maximum relative jitter for brightness, contrast and saturation.
    pub const COLOR_JITTER: f32 = 0.2;
}

/// Training loop policy constants.
pub mod training {
    /// Learning-rate reduction factor on validation-loss plateau.
    pub const LR_PLATEAU_FACTOR: f64 = 0.5;
    /// Epochs without validation-loss improvement before reducing the rate.
    pub const LR_PLATEAU_PATIENCE: usize = 3;
    /// Epochs without validation-loss improvement before stopping early.
    pub const EARLY_STOP_PATIENCE: usize = 5;
    /// Default number of training epochs.
    pub const DEFAULT_EPOCHS: usize = 30;
    /// Default epoch at which the backbone is unfrozen.
    pub const DEFAULT_UNFREEZE_EPOCH: usize = 10;
    /// Default training batch size.
    pub const DEFAULT_BATCH_SIZE: usize = 32;
    /// Default initial learning rate.
    pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;
    /// Default L2 regularization weight.
    pub const DEFAULT_WEIGHT_DECAY: f64 = 1e-4;
}

/// Drift detection parameters.
pub mod drift {
    /// Default accuracy-regression threshold.
    pub const DEFAULT_THRESHOLD: f64 = 0.05;
    /// Number of most recent snapshots averaged against the baseline.
    pub const RECENT_WINDOW: usize = 10;
}

/// HTTP service defaults.
pub mod service {
    /// Default bind address.
    pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
    /// Default model version string reported by the service.
    pub const DEFAULT_MODEL_VERSION: &str = "resnet50_v1";
    /// Maximum accepted upload size in bytes.
    pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
}
