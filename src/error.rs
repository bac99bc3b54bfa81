//! Error types for wildeye.

/// Result type alias for wildeye operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for wildeye.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Model weights file does not exist.
    #[error("model file does not exist: {path}")]
    ModelFileNotFound {
        /// Path to the missing model file.
        path: std::path::PathBuf,
    },

    /// Failed to load the model into the inference runtime.
    #[error("failed to load model '{path}': {reason}")]
    ModelLoad {
        /// Path to the model file.
        path: std::path::PathBuf,
        /// Description of the load failure.
        reason: String,
    },

    /// Prediction was attempted before the model was loaded.
    #[error("model not loaded; call load_model() first")]
    ModelNotLoaded,

    /// Failed to read species mapping file.
    #[error("failed to read species mapping file '{path}'")]
    SpeciesMapRead {
        /// Path to the species mapping file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse species mapping file.
    #[error("failed to parse species mapping file '{path}'")]
    SpeciesMapParse {
        /// Path to the species mapping file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Species mapping does not form a dense 0..N-1 index set.
    #[error("invalid species mapping: {message}")]
    SpeciesMapInvalid {
        /// Description of the invariant violation.
        message: String,
    },

    /// Image could not be decoded.
    #[error("failed to decode image '{path}'")]
    Decode {
        /// Path (or upload name) of the image.
        path: std::path::PathBuf,
        /// Underlying decode error.
        #[source]
        source: image::ImageError,
    },

    /// Inference failed after the image was decoded.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// No image files were found in the provided paths.
    #[error("no valid image files found in the provided paths")]
    NoValidImageFiles,

    /// Failed to create a session log.
    #[error("failed to create session log in '{dir}'")]
    SessionLogCreate {
        /// Directory the session log was to be created in.
        dir: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to append to a session log.
    #[error("failed to write session log '{path}'")]
    SessionLogWrite {
        /// Path to the session log file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a session log back from disk.
    #[error("failed to read session log '{path}'")]
    SessionLogRead {
        /// Path to the session log file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the metrics log.
    #[error("failed to write metrics log '{path}'")]
    MetricsLogWrite {
        /// Path to the metrics log file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read the metrics log.
    #[error("failed to read metrics log '{path}'")]
    MetricsLogRead {
        /// Path to the metrics log file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A log record could not be serialized or deserialized.
    #[error("failed to serialize log record")]
    RecordSerialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write a training checkpoint.
    #[error("failed to write checkpoint '{path}'")]
    CheckpointWrite {
        /// Path to the checkpoint file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to read a training checkpoint.
    #[error("failed to read checkpoint '{path}'")]
    CheckpointRead {
        /// Path to the checkpoint file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A training step failed inside the training backend.
    #[error("training step failed: {reason}")]
    TrainStep {
        /// Description of the failure.
        reason: String,
    },

    /// Dataset directory contains no usable samples.
    #[error("no training samples found under '{path}'")]
    EmptyDataset {
        /// Dataset root that was scanned.
        path: std::path::PathBuf,
    },

    /// HTTP service failed to bind or serve.
    #[error("service error: {message}")]
    Service {
        /// Description of the failure.
        message: String,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Whether the error originates from unusable client input (a corrupt
    /// or non-image upload) rather than a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
