//! CLI argument definitions.

use crate::cli::validators::{parse_confidence, parse_drift_threshold};
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Wildlife species image classification.
#[derive(Debug, Parser)]
#[command(name = "wildeye")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify images with a trained model.
    Predict(PredictArgs),
    /// Run the prediction HTTP service.
    Serve(ServeArgs),
    /// Report on recorded model metrics.
    Metrics {
        /// Metrics action to perform.
        #[command(subcommand)]
        action: MetricsAction,
    },
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for the predict command.
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("input").required(true).multiple(false)))]
pub struct PredictArgs {
    /// Path to trained model weights.
    #[arg(long, env = "WILDEYE_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Path to species mapping JSON file.
    #[arg(long, env = "WILDEYE_SPECIES_MAP")]
    pub species_map: Option<PathBuf>,

    /// Path to a single image to classify.
    #[arg(long, group = "input")]
    pub image: Option<PathBuf>,

    /// Directory of images to classify.
    #[arg(long, group = "input")]
    pub directory: Option<PathBuf>,

    /// Do not descend into subdirectories of --directory.
    #[arg(long)]
    pub no_recursive: bool,

    /// Minimum confidence threshold (0.0-1.0).
    #[arg(short = 'c', long, value_parser = parse_confidence, env = "WILDEYE_CONFIDENCE_THRESHOLD")]
    pub confidence_threshold: Option<f32>,

    /// Directory to store prediction session logs.
    #[arg(long, env = "WILDEYE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Suppress the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the serve command.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Socket address to bind (host:port).
    #[arg(long, env = "WILDEYE_BIND")]
    pub bind: Option<String>,

    /// Path to trained model weights.
    #[arg(long, env = "WILDEYE_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Path to species mapping JSON file.
    #[arg(long, env = "WILDEYE_SPECIES_MAP")]
    pub species_map: Option<PathBuf>,

    /// Minimum confidence threshold (0.0-1.0).
    #[arg(short = 'c', long, value_parser = parse_confidence, env = "WILDEYE_CONFIDENCE_THRESHOLD")]
    pub confidence_threshold: Option<f32>,

    /// Model version string reported with predictions.
    #[arg(long, env = "WILDEYE_MODEL_VERSION")]
    pub model_version: Option<String>,
}

/// Metrics subcommand actions.
#[derive(Debug, Subcommand)]
pub enum MetricsAction {
    /// Summarize accuracy and loss over the recorded history.
    Report {
        /// Directory holding the metrics log.
        #[arg(long, env = "WILDEYE_METRICS_DIR")]
        metrics_dir: Option<PathBuf>,
    },
    /// Check for accuracy drift against the first recorded baseline.
    Drift {
        /// Directory holding the metrics log.
        #[arg(long, env = "WILDEYE_METRICS_DIR")]
        metrics_dir: Option<PathBuf>,

        /// Accuracy-regression threshold (0.0-1.0).
        #[arg(short, long, value_parser = parse_drift_threshold)]
        threshold: Option<f64>,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}
