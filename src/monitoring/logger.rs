//! Append-only prediction session logging.

use crate::error::{Error, Result};
use crate::inference::PredictionRecord;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Logs prediction records to an append-only session file.
///
/// One logger instance owns exactly one session, named after its creation
/// timestamp; there is no session switching. Each record is flushed as it
/// arrives so a crash loses at most the record being written.
pub struct PredictionLogger {
    session_path: PathBuf,
}

impl PredictionLogger {
    /// Create a logger with a fresh session file under `log_dir`.
    pub fn new(log_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(log_dir).map_err(|e| Error::SessionLogCreate {
            dir: log_dir.to_path_buf(),
            source: e,
        })?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let session_path = log_dir.join(format!("session_{timestamp}.jsonl"));
        debug!("Prediction session log: {}", session_path.display());

        Ok(Self { session_path })
    }

    /// Path of the session log file.
    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// Append one record to the session log, flushing immediately.
    pub fn log_prediction(&self, record: &PredictionRecord) -> Result<()> {
        let line =
            serde_json::to_string(record).map_err(|e| Error::RecordSerialize { source: e })?;

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.session_path)
            .map_err(|e| Error::SessionLogWrite {
                path: self.session_path.clone(),
                source: e,
            })?;

        // One write call per record keeps concurrent appends from
        // interleaving within a line.
        writeln!(file, "{line}").map_err(|e| Error::SessionLogWrite {
            path: self.session_path.clone(),
            source: e,
        })?;
        file.flush().map_err(|e| Error::SessionLogWrite {
            path: self.session_path.clone(),
            source: e,
        })
    }

    /// Append multiple records in input order.
    pub fn log_batch(&self, records: &[PredictionRecord]) -> Result<()> {
        for record in records {
            self.log_prediction(record)?;
        }
        Ok(())
    }

    /// Compute statistics over the session by re-reading the log from disk.
    ///
    /// Reading durable state rather than memory means the numbers survive a
    /// process restart. A session with no records yields zeroed statistics.
    pub fn session_statistics(&self) -> Result<SessionStats> {
        if !self.session_path.exists() {
            return Ok(SessionStats::default());
        }

        let file = std::fs::File::open(&self.session_path).map_err(|e| Error::SessionLogRead {
            path: self.session_path.clone(),
            source: e,
        })?;

        let mut stats = SessionStats::default();
        let mut confidences: Vec<f64> = Vec::new();

        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| Error::SessionLogRead {
                path: self.session_path.clone(),
                source: e,
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let record: PredictionRecord =
                serde_json::from_str(&line).map_err(|e| Error::RecordSerialize { source: e })?;

            stats.total_predictions += 1;
            match record {
                PredictionRecord::Failure(_) => stats.errors += 1,
                PredictionRecord::Success(result) => {
                    confidences.push(f64::from(result.confidence));
                    *stats
                        .species_distribution
                        .entry(result.predicted_species)
                        .or_insert(0) += 1;
                }
            }
        }

        stats.successful_predictions = stats.total_predictions - stats.errors;
        if !confidences.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let n = confidences.len() as f64;
            let mean = confidences.iter().sum::<f64>() / n;
            stats.average_confidence = mean;
            stats.min_confidence = confidences.iter().copied().fold(f64::INFINITY, f64::min);
            stats.max_confidence = confidences
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            // Population standard deviation over the session.
            stats.std_confidence = (confidences
                .iter()
                .map(|c| (c - mean).powi(2))
                .sum::<f64>()
                / n)
                .sqrt();
        }

        Ok(stats)
    }
}

/// Statistics over one prediction session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    /// Total records in the session, including failures.
    pub total_predictions: usize,
    /// Records that carried a prediction.
    pub successful_predictions: usize,
    /// Records that captured a failure.
    pub errors: usize,
    /// Mean confidence over successful records, 0 when none.
    pub average_confidence: f64,
    /// Minimum confidence, 0 when none.
    pub min_confidence: f64,
    /// Maximum confidence, 0 when none.
    pub max_confidence: f64,
    /// Population standard deviation of confidence, 0 when none.
    pub std_confidence: f64,
    /// Count of successful predictions per species.
    pub species_distribution: HashMap<String, usize>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::inference::{ErrorRecord, Prediction, PredictionResult};
    use tempfile::tempdir;

    fn sample_result(species: &str, confidence: f32) -> PredictionRecord {
        PredictionRecord::Success(PredictionResult {
            image_path: format!("{species}.jpg"),
            predicted_species: species.to_string(),
            confidence,
            is_confident: confidence >= 0.5,
            top_predictions: vec![Prediction {
                species: species.to_string(),
                confidence,
            }],
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn test_empty_session_statistics_are_zeroed() {
        let dir = tempdir().unwrap();
        let logger = PredictionLogger::new(dir.path()).unwrap();

        let stats = logger.session_statistics().unwrap();
        assert_eq!(stats.total_predictions, 0);
        assert_eq!(stats.average_confidence, 0.0);
        assert_eq!(stats.std_confidence, 0.0);
        assert!(stats.species_distribution.is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_confidence_and_label() {
        let dir = tempdir().unwrap();
        let logger = PredictionLogger::new(dir.path()).unwrap();

        logger.log_prediction(&sample_result("Lion", 0.875)).unwrap();

        let stats = logger.session_statistics().unwrap();
        assert_eq!(stats.total_predictions, 1);
        assert_eq!(stats.successful_predictions, 1);
        assert!((stats.average_confidence - 0.875).abs() < 1e-9);
        assert!((stats.min_confidence - 0.875).abs() < 1e-9);
        assert!((stats.max_confidence - 0.875).abs() < 1e-9);
        assert_eq!(stats.species_distribution.get("Lion"), Some(&1));
    }

    #[test]
    fn test_statistics_separate_errors() {
        let dir = tempdir().unwrap();
        let logger = PredictionLogger::new(dir.path()).unwrap();

        logger
            .log_batch(&[
                sample_result("Lion", 0.9),
                PredictionRecord::Failure(ErrorRecord {
                    image_path: "bad.jpg".to_string(),
                    error: "failed to decode image 'bad.jpg'".to_string(),
                }),
                sample_result("Zebra", 0.7),
            ])
            .unwrap();

        let stats = logger.session_statistics().unwrap();
        assert_eq!(stats.total_predictions, 3);
        assert_eq!(stats.successful_predictions, 2);
        assert_eq!(stats.errors, 1);
        assert!((stats.average_confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_each_logger_owns_one_session_file() {
        let dir = tempdir().unwrap();
        let logger = PredictionLogger::new(dir.path()).unwrap();

        logger.log_prediction(&sample_result("Lion", 0.6)).unwrap();
        logger.log_prediction(&sample_result("Lion", 0.7)).unwrap();

        let contents = std::fs::read_to_string(logger.session_path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
