//! HTTP request handlers.

use crate::error::Error;
use crate::inference::Prediction;
use crate::service::AppState;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Write;
use tracing::{debug, warn};

/// Health check payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` once the model is loaded.
    pub status: String,
    /// Whether the model has been loaded.
    pub model_loaded: bool,
    /// Configured model version.
    pub model_version: String,
    /// Number of species classes served.
    pub species_count: usize,
    /// Seconds since service startup.
    pub uptime_seconds: f64,
}

/// Prediction payload returned by `POST /predict`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Top-predicted species label.
    pub predicted_species: String,
    /// Softmax probability of the top prediction.
    pub confidence: f32,
    /// Whether the confidence met the configured threshold.
    pub is_confident: bool,
    /// Ranked predictions, descending by confidence.
    pub top_predictions: Vec<Prediction>,
    /// Configured model version.
    pub model_version: String,
    /// When the prediction was made.
    pub timestamp: DateTime<Utc>,
}

/// Request failure carrying the HTTP status it maps to.
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            _ if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let detail = if status == StatusCode::BAD_REQUEST {
            format!("Invalid or corrupted image file: {e}")
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            "Model not loaded. Service is starting up or failed to initialize.".to_string()
        } else {
            format!("Model inference failed: {e}")
        };
        Self { status, detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("Request failed ({}): {}", self.status, self.detail);
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// `GET /` service information.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "wildeye prediction service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "GET /health",
            "predict": "POST /predict",
        },
    }))
}

/// `GET /health` readiness probe.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let loaded = state.predictor().is_loaded();
    Json(HealthResponse {
        status: if loaded { "healthy" } else { "unhealthy" }.to_string(),
        model_loaded: loaded,
        model_version: state.model_version().to_string(),
        species_count: state.predictor().species().len(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// `POST /predict` classify an uploaded image.
pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, Response> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")).into_response())?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        if !content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
        {
            return Err(ApiError::bad_request(format!(
                "Invalid file type: {}. Must be an image (jpg, jpeg, png).",
                content_type.as_deref().unwrap_or("unknown")
            ))
            .into_response());
        }

        let file_name = field.file_name().unwrap_or("upload.jpg").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")).into_response())?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::bad_request("missing 'image' upload field").into_response());
    };

    let result = run_prediction(&state, &file_name, &bytes)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    Ok(Json(PredictionResponse {
        predicted_species: result.predicted_species,
        confidence: result.confidence,
        is_confident: result.is_confident,
        top_predictions: result.top_predictions,
        model_version: state.model_version().to_string(),
        timestamp: result.timestamp,
    }))
}

/// Spool the upload to a temp file and predict on it.
///
/// Inference is CPU-bound, so it runs on the blocking pool rather than a
/// runtime worker. The temp file is removed when its handle drops; a failed
/// cleanup never masks the prediction outcome.
async fn run_prediction(
    state: &AppState,
    file_name: &str,
    bytes: &[u8],
) -> crate::error::Result<crate::inference::PredictionResult> {
    let suffix = std::path::Path::new(file_name)
        .extension()
        .map_or_else(|| ".jpg".to_string(), |ext| format!(".{}", ext.to_string_lossy()));

    let state = state.clone();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || {
        let mut temp = tempfile::Builder::new()
            .prefix("wildeye_upload_")
            .suffix(&suffix)
            .tempfile()?;
        temp.write_all(&bytes)?;
        temp.flush()?;

        debug!("Spooled upload to {}", temp.path().display());
        state.predictor().predict_single(temp.path())
    })
    .await
    .map_err(|e| Error::Internal {
        message: format!("prediction task failed: {e}"),
    })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_errors_map_to_bad_request() {
        let error = Error::Decode {
            path: "upload.jpg".into(),
            source: image::ImageError::Unsupported(
                image::error::UnsupportedError::from_format_and_kind(
                    image::error::ImageFormatHint::Unknown,
                    image::error::UnsupportedErrorKind::GenericFeature("bad".to_string()),
                ),
            ),
        };
        assert_eq!(ApiError::from(error).status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unloaded_model_maps_to_service_unavailable() {
        assert_eq!(
            ApiError::from(Error::ModelNotLoaded).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_other_failures_map_to_internal_error() {
        let error = Error::Inference {
            reason: "forward pass failed".to_string(),
        };
        assert_eq!(
            ApiError::from(error).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
