//! Model performance monitoring and drift detection.

use crate::constants::{METRICS_LOG_FILENAME, drift};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// One recorded evaluation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// When the metrics were recorded.
    pub timestamp: DateTime<Utc>,
    /// Optional model version identifier.
    pub model_version: Option<String>,
    /// Named numeric metrics (e.g. accuracy, loss).
    #[serde(flatten)]
    pub metrics: BTreeMap<String, f64>,
}

impl MetricSnapshot {
    /// Value of a named metric, if present.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Tracks model metrics over time and flags accuracy regressions.
///
/// Every recorded snapshot goes to both the in-memory history and an
/// append-only JSONL log; nothing is ever edited or removed.
pub struct ModelMonitor {
    metrics_path: PathBuf,
    history: Vec<MetricSnapshot>,
}

impl ModelMonitor {
    /// Create a monitor with an empty history, logging under `metrics_dir`.
    pub fn new(metrics_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(metrics_dir)?;
        Ok(Self {
            metrics_path: metrics_dir.join(METRICS_LOG_FILENAME),
            history: Vec::new(),
        })
    }

    /// Create a monitor whose history is replayed from an existing metrics
    /// log, for offline reporting over past evaluation runs.
    pub fn from_log_dir(metrics_dir: &Path) -> Result<Self> {
        let mut monitor = Self::new(metrics_dir)?;
        if !monitor.metrics_path.exists() {
            return Ok(monitor);
        }

        let file = std::fs::File::open(&monitor.metrics_path).map_err(|e| {
            Error::MetricsLogRead {
                path: monitor.metrics_path.clone(),
                source: e,
            }
        })?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| Error::MetricsLogRead {
                path: monitor.metrics_path.clone(),
                source: e,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let snapshot: MetricSnapshot =
                serde_json::from_str(&line).map_err(|e| Error::RecordSerialize { source: e })?;
            monitor.history.push(snapshot);
        }

        Ok(monitor)
    }

    /// Recorded snapshots, oldest first.
    pub fn history(&self) -> &[MetricSnapshot] {
        &self.history
    }

    /// Record an evaluation event to memory and to the durable log.
    pub fn record_metrics(
        &mut self,
        metrics: BTreeMap<String, f64>,
        model_version: Option<&str>,
    ) -> Result<()> {
        let snapshot = MetricSnapshot {
            timestamp: Utc::now(),
            model_version: model_version.map(str::to_string),
            metrics,
        };

        let line =
            serde_json::to_string(&snapshot).map_err(|e| Error::RecordSerialize { source: e })?;
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.metrics_path)
            .map_err(|e| Error::MetricsLogWrite {
                path: self.metrics_path.clone(),
                source: e,
            })?;
        writeln!(file, "{line}").map_err(|e| Error::MetricsLogWrite {
            path: self.metrics_path.clone(),
            source: e,
        })?;

        self.history.push(snapshot);
        Ok(())
    }

    /// Summarize accuracy and loss over the full in-memory history.
    pub fn performance_report(&self) -> PerformanceReport {
        let accuracies: Vec<f64> = self
            .history
            .iter()
            .filter_map(|s| s.metric("accuracy"))
            .collect();
        let losses: Vec<f64> = self
            .history
            .iter()
            .filter_map(|s| s.metric("loss"))
            .collect();

        PerformanceReport {
            total_evaluations: self.history.len(),
            average_accuracy: mean(&accuracies),
            max_accuracy: max(&accuracies),
            min_accuracy: min(&accuracies),
            average_loss: mean(&losses),
            min_loss: min(&losses),
            max_loss: max(&losses),
            last_evaluation: self.history.last().cloned(),
        }
    }

    /// Detect a sustained accuracy regression.
    ///
    /// Compares the first-ever recorded accuracy against the mean accuracy
    /// of the most recent 10 snapshots (fewer if history is shorter);
    /// snapshots without an accuracy metric count as 0 on both sides. Drift
    /// is flagged only for a regression larger than `threshold`; an
    /// improvement never flags.
    pub fn detect_drift(&self, threshold: f64) -> DriftReport {
        if self.history.len() < 2 {
            return DriftReport {
                drift_detected: false,
                reason: Some("insufficient data".to_string()),
                ..DriftReport::with_threshold(threshold)
            };
        }

        let start = self.history.len().saturating_sub(drift::RECENT_WINDOW);
        let recent: Vec<f64> = self.history[start..]
            .iter()
            .map(|s| s.metric("accuracy").unwrap_or(0.0))
            .collect();
        let recent_accuracy = mean(&recent);
        let oldest_accuracy = self.history[0].metric("accuracy").unwrap_or(0.0);

        let accuracy_drop = oldest_accuracy - recent_accuracy;
        let drift_detected = accuracy_drop > threshold;

        if drift_detected {
            info!(
                "Accuracy drift detected: baseline {:.4} vs recent {:.4}",
                oldest_accuracy, recent_accuracy
            );
        }

        DriftReport {
            drift_detected,
            accuracy_drop,
            threshold,
            oldest_accuracy,
            recent_accuracy,
            recommendation: if drift_detected {
                "retrain model".to_string()
            } else {
                "model performing well".to_string()
            },
            reason: None,
        }
    }
}

/// Summary of accuracy/loss metrics over a monitor's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Number of recorded evaluation events.
    pub total_evaluations: usize,
    /// Mean of recorded accuracy values, 0 when none.
    pub average_accuracy: f64,
    /// Maximum recorded accuracy, 0 when none.
    pub max_accuracy: f64,
    /// Minimum recorded accuracy, 0 when none.
    pub min_accuracy: f64,
    /// Mean of recorded loss values, 0 when none.
    pub average_loss: f64,
    /// Minimum recorded loss, 0 when none.
    pub min_loss: f64,
    /// Maximum recorded loss, 0 when none.
    pub max_loss: f64,
    /// Most recent snapshot, if any.
    pub last_evaluation: Option<MetricSnapshot>,
}

/// Result of a drift check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    /// Whether a regression beyond the threshold was found.
    pub drift_detected: bool,
    /// Baseline accuracy minus recent mean accuracy.
    pub accuracy_drop: f64,
    /// Threshold the drop was compared against.
    pub threshold: f64,
    /// Accuracy of the first-ever snapshot.
    pub oldest_accuracy: f64,
    /// Mean accuracy of the most recent snapshots.
    pub recent_accuracy: f64,
    /// Operator guidance.
    pub recommendation: String,
    /// Why no verdict could be produced, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DriftReport {
    fn with_threshold(threshold: f64) -> Self {
        Self {
            drift_detected: false,
            accuracy_drop: 0.0,
            threshold,
            oldest_accuracy: 0.0,
            recent_accuracy: 0.0,
            recommendation: String::new(),
            reason: None,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

fn min(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn accuracy_entry(value: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([("accuracy".to_string(), value)])
    }

    #[test]
    fn test_record_appends_to_memory_and_log() {
        let dir = tempdir().unwrap();
        let mut monitor = ModelMonitor::new(dir.path()).unwrap();

        monitor
            .record_metrics(accuracy_entry(0.9), Some("resnet50_v1"))
            .unwrap();
        monitor.record_metrics(accuracy_entry(0.91), None).unwrap();

        assert_eq!(monitor.history().len(), 2);
        let contents =
            std::fs::read_to_string(dir.path().join(METRICS_LOG_FILENAME)).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_history_replay_from_log() {
        let dir = tempdir().unwrap();
        {
            let mut monitor = ModelMonitor::new(dir.path()).unwrap();
            monitor.record_metrics(accuracy_entry(0.8), None).unwrap();
            monitor.record_metrics(accuracy_entry(0.85), None).unwrap();
        }

        let replayed = ModelMonitor::from_log_dir(dir.path()).unwrap();
        assert_eq!(replayed.history().len(), 2);
        assert_eq!(replayed.history()[0].metric("accuracy"), Some(0.8));
    }

    #[test]
    fn test_performance_report_defaults_missing_metrics_to_zero() {
        let dir = tempdir().unwrap();
        let mut monitor = ModelMonitor::new(dir.path()).unwrap();
        monitor.record_metrics(accuracy_entry(0.9), None).unwrap();

        let report = monitor.performance_report();
        assert_eq!(report.total_evaluations, 1);
        assert_eq!(report.average_accuracy, 0.9);
        // No loss recorded anywhere.
        assert_eq!(report.average_loss, 0.0);
        assert_eq!(report.min_loss, 0.0);
        assert!(report.last_evaluation.is_some());
    }

    #[test]
    fn test_drift_insufficient_data() {
        let dir = tempdir().unwrap();
        let mut monitor = ModelMonitor::new(dir.path()).unwrap();
        monitor.record_metrics(accuracy_entry(0.9), None).unwrap();

        let report = monitor.detect_drift(0.05);
        assert!(!report.drift_detected);
        assert_eq!(report.reason.as_deref(), Some("insufficient data"));
    }

    #[test]
    fn test_drift_detects_regression() {
        let dir = tempdir().unwrap();
        let mut monitor = ModelMonitor::new(dir.path()).unwrap();

        // Oldest entry 0.90, then nine entries of 0.80: the recent window
        // covers the last ten entries whose mean is 0.81.
        monitor.record_metrics(accuracy_entry(0.90), None).unwrap();
        for _ in 0..9 {
            monitor.record_metrics(accuracy_entry(0.80), None).unwrap();
        }

        let report = monitor.detect_drift(0.05);
        assert!(report.drift_detected);
        assert!((report.oldest_accuracy - 0.90).abs() < 1e-9);
        assert!((report.recent_accuracy - 0.81).abs() < 1e-9);
        assert!((report.accuracy_drop - 0.09).abs() < 1e-9);
    }

    #[test]
    fn test_drift_ignores_improvement() {
        let dir = tempdir().unwrap();
        let mut monitor = ModelMonitor::new(dir.path()).unwrap();

        monitor.record_metrics(accuracy_entry(0.70), None).unwrap();
        for _ in 0..5 {
            monitor.record_metrics(accuracy_entry(0.95), None).unwrap();
        }

        let report = monitor.detect_drift(0.05);
        assert!(!report.drift_detected);
        assert_eq!(report.recommendation, "model performing well");
    }
}
