//! Wildeye - wildlife species image classification.
//!
//! This crate provides a prediction pipeline around a pretrained
//! classification model, with session logging, performance monitoring and a
//! thin HTTP service.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod model;
pub mod monitoring;
pub mod preprocess;
pub mod service;
pub mod training;
pub mod utils;

use clap::Parser;
use cli::{Cli, Command, ConfigAction, MetricsAction, PredictArgs, ServeArgs};
use config::Config;
use constants::drift;
use inference::{PredictionRecord, Predictor};
use model::SpeciesMap;
use monitoring::{ModelMonitor, PredictionLogger};
use std::path::{Path, PathBuf};
use tracing::info;

pub use error::{Error, Result};

/// Main entry point for the wildeye CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.quiet);

    // Load configuration
    let config = config::load_default_config()?;

    match cli.command {
        Command::Predict(args) => run_predict(&args, &config, cli.quiet),
        Command::Serve(args) => run_serve(&args, &config),
        Command::Metrics { action } => handle_metrics_command(action, &config),
        Command::Config { action } => handle_config_command(action),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is suppressed by default; -v raises it with the rest.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).init();
}

/// Build a loaded predictor from resolved paths.
fn build_predictor(
    model_path: &Path,
    species_map_path: &Path,
    threshold: f32,
) -> Result<Predictor> {
    info!(
        "Loading species mapping from: {}",
        species_map_path.display()
    );
    let species = SpeciesMap::from_json_file(species_map_path)?;
    info!("Species mapping loaded: {} species", species.len());

    info!("Loading model from: {}", model_path.display());
    let mut predictor = Predictor::new(model_path.to_path_buf(), species, threshold);
    predictor.load_model()?;
    Ok(predictor)
}

fn run_predict(args: &PredictArgs, config: &Config, quiet: bool) -> Result<()> {
    let model_path = resolve_path(
        args.model_path.as_ref(),
        config.model.path.as_ref(),
        "model path",
        "--model-path",
        "model.path",
    )?;
    let species_map_path = resolve_path(
        args.species_map.as_ref(),
        config.model.species_map.as_ref(),
        "species mapping",
        "--species-map",
        "model.species_map",
    )?;
    let threshold = args
        .confidence_threshold
        .unwrap_or(config.defaults.confidence_threshold);
    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| config.defaults.log_dir.clone());

    let predictor = build_predictor(&model_path, &species_map_path, threshold)?;
    let logger = PredictionLogger::new(&log_dir)?;

    if let Some(image) = &args.image {
        // Single-image failures propagate; there is no batch to isolate
        // them into.
        let result = predictor.predict_single(image)?;

        println!("Result:");
        println!("  Predicted Species: {}", result.predicted_species);
        println!("  Confidence: {:.2}%", result.confidence * 100.0);
        println!(
            "  Is Confident (>{:.0}%): {}",
            threshold * 100.0,
            result.is_confident
        );
        println!("\nTop {} Predictions:", result.top_predictions.len());
        for (i, p) in result.top_predictions.iter().enumerate() {
            println!("  {}. {}: {:.2}%", i + 1, p.species, p.confidence * 100.0);
        }

        logger.log_prediction(&PredictionRecord::Success(result))?;
    } else if let Some(directory) = &args.directory {
        let files = inference::collect_image_files(directory, !args.no_recursive)?;
        if files.is_empty() {
            return Err(Error::NoValidImageFiles);
        }
        info!("Found {} image file(s) to classify", files.len());

        let progress_enabled = !quiet && !args.no_progress;
        let progress = utils::progress::create_image_progress(files.len(), progress_enabled);

        let mut records = Vec::with_capacity(files.len());
        for file in &files {
            records.extend(predictor.predict_batch(std::slice::from_ref(file)));
            utils::progress::inc_progress(progress.as_ref());
        }
        utils::progress::finish_progress(progress, "Complete");

        logger.log_batch(&records)?;

        let stats = Predictor::prediction_statistics(&records);
        println!("Processed {} images", records.len());
        println!("\nPrediction Statistics:");
        println!("  Total Predictions: {}", stats.total_predictions);
        println!("  Confident Predictions: {}", stats.confident_predictions);
        println!("  Confidence Rate: {:.2}%", stats.confidence_rate * 100.0);
        println!(
            "  Average Confidence: {:.2}%",
            stats.average_confidence * 100.0
        );
        println!("  Errors: {}", stats.errors);

        let mut distribution: Vec<_> = stats.species_distribution.iter().collect();
        distribution.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        println!("\nSpecies Distribution:");
        for (species, count) in distribution {
            println!("  {species}: {count}");
        }
    }

    let session_stats = logger.session_statistics()?;
    println!(
        "\nPredictions logged to: {}",
        logger.session_path().display()
    );
    println!("  Session Statistics:");
    println!("  - Total: {}", session_stats.total_predictions);
    println!(
        "  - Average Confidence: {:.2}%",
        session_stats.average_confidence * 100.0
    );

    Ok(())
}

fn run_serve(args: &ServeArgs, config: &Config) -> Result<()> {
    let model_path = resolve_path(
        args.model_path.as_ref(),
        config.model.path.as_ref(),
        "model path",
        "--model-path",
        "model.path",
    )?;
    let species_map_path = resolve_path(
        args.species_map.as_ref(),
        config.model.species_map.as_ref(),
        "species mapping",
        "--species-map",
        "model.species_map",
    )?;
    let threshold = args
        .confidence_threshold
        .unwrap_or(config.defaults.confidence_threshold);
    let bind = args
        .bind
        .clone()
        .unwrap_or_else(|| config.service.bind.clone());
    let model_version = args
        .model_version
        .clone()
        .or_else(|| config.model.version.clone())
        .unwrap_or_else(|| constants::service::DEFAULT_MODEL_VERSION.to_string());

    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })?;

    runtime.block_on(async {
        // Model loading happens here, before any request is accepted.
        let state = service::AppState::initialize(
            &model_path,
            &species_map_path,
            threshold,
            model_version,
        )?;
        info!("Confidence threshold: {threshold}");
        service::serve(&bind, state).await
    })
}

fn handle_metrics_command(action: MetricsAction, config: &Config) -> Result<()> {
    match action {
        MetricsAction::Report { metrics_dir } => {
            let dir = resolve_metrics_dir(metrics_dir, config);
            let monitor = ModelMonitor::from_log_dir(&dir)?;
            let report = monitor.performance_report();

            println!("Performance Report ({} evaluations):", report.total_evaluations);
            println!(
                "  Accuracy: avg {:.4}, min {:.4}, max {:.4}",
                report.average_accuracy, report.min_accuracy, report.max_accuracy
            );
            println!(
                "  Loss: avg {:.4}, min {:.4}, max {:.4}",
                report.average_loss, report.min_loss, report.max_loss
            );
            if let Some(last) = &report.last_evaluation {
                println!(
                    "  Last evaluation: {} (model version: {})",
                    last.timestamp,
                    last.model_version.as_deref().unwrap_or("unknown")
                );
            }
            Ok(())
        }
        MetricsAction::Drift {
            metrics_dir,
            threshold,
        } => {
            let dir = resolve_metrics_dir(metrics_dir, config);
            let monitor = ModelMonitor::from_log_dir(&dir)?;
            let report = monitor.detect_drift(threshold.unwrap_or(drift::DEFAULT_THRESHOLD));

            if let Some(reason) = &report.reason {
                println!("Drift check inconclusive: {reason}");
                return Ok(());
            }

            println!("Drift detected: {}", report.drift_detected);
            println!(
                "  Baseline accuracy: {:.4}, recent accuracy: {:.4}",
                report.oldest_accuracy, report.recent_accuracy
            );
            println!(
                "  Accuracy drop: {:.4} (threshold {:.4})",
                report.accuracy_drop, report.threshold
            );
            println!("  Recommendation: {}", report.recommendation);
            Ok(())
        }
    }
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config::config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let config = Config::default();
                let saved_path = config::save_default_config(&config)?;
                println!("Created configuration file: {}", saved_path.display());
                println!("\nNext steps:");
                println!("  set model.path and model.species_map, then run:");
                println!("  wildeye predict --image <photo.jpg>");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = config::load_default_config()?;
            println!("{config:#?}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config::config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Resolve a path from CLI argument or config, erroring with guidance when
/// neither is set.
fn resolve_path(
    from_args: Option<&PathBuf>,
    from_config: Option<&PathBuf>,
    what: &str,
    flag: &str,
    config_key: &str,
) -> Result<PathBuf> {
    from_args
        .or(from_config)
        .cloned()
        .ok_or_else(|| Error::ConfigValidation {
            message: format!("no {what} specified (use {flag} or set {config_key} in config)"),
        })
}

fn resolve_metrics_dir(from_args: Option<PathBuf>, config: &Config) -> PathBuf {
    from_args.unwrap_or_else(|| config.defaults.metrics_dir.clone())
}
