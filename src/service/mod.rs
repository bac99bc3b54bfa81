//! Thin HTTP boundary over the predictor.
//!
//! The service context is constructed once at startup, with the model
//! loaded before the listener accepts traffic, and is passed by reference
//! into request handlers.

mod handlers;

pub use handlers::{HealthResponse, PredictionResponse};

use crate::error::{Error, Result};
use crate::inference::Predictor;
use crate::model::SpeciesMap;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared, read-only service context.
#[derive(Clone)]
pub struct AppState {
    predictor: Arc<Predictor>,
    model_version: String,
    started_at: Instant,
}

impl AppState {
    /// Build the service context, loading the model eagerly so prediction
    /// traffic never observes an unloaded predictor.
    pub fn initialize(
        model_path: &Path,
        species_map_path: &Path,
        confidence_threshold: f32,
        model_version: String,
    ) -> Result<Self> {
        info!(
            "Loading species mapping from: {}",
            species_map_path.display()
        );
        let species = SpeciesMap::from_json_file(species_map_path)?;
        info!("Loaded {} species", species.len());

        info!("Initializing predictor with model: {}", model_path.display());
        let mut predictor =
            Predictor::new(model_path.to_path_buf(), species, confidence_threshold);
        predictor.load_model()?;

        Ok(Self {
            predictor: Arc::new(predictor),
            model_version,
            started_at: Instant::now(),
        })
    }

    /// The shared predictor.
    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Version string reported with predictions.
    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Seconds since the context was constructed.
    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .layer(DefaultBodyLimit::max(crate::constants::service::MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Bind and serve until interrupted.
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| Error::Service {
            message: format!("failed to bind {bind}: {e}"),
        })?;

    info!("Prediction service listening on {bind}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Service {
            message: e.to_string(),
        })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}
