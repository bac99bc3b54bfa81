//! Training orchestration tests with a scripted optimization backend.

#![allow(clippy::unwrap_used)]

use ndarray::Array4;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::tempdir;
use wildeye::model::{BatchMetrics, TrainPhase, TrainableModel};
use wildeye::monitoring::ModelMonitor;
use wildeye::training::{Batch, BatchProvider, Checkpoint, FitOptions, Trainer};

struct TwoSampleBatches(usize);

impl BatchProvider for TwoSampleBatches {
    fn iter_batches(&self) -> Box<dyn Iterator<Item = wildeye::Result<Batch>> + '_> {
        Box::new((0..self.0).map(|_| {
            Ok(Batch {
                images: Array4::zeros((2, 3, 224, 224)),
                labels: vec![0, 1],
            })
        }))
    }

    fn num_batches(&self) -> usize {
        self.0
    }
}

/// Backend that scripts validation losses and records which phase each
/// epoch's gradient updates ran in.
struct RecordingBackend {
    val_losses: Vec<f64>,
    epoch: usize,
    phase: TrainPhase,
    phases_by_epoch: Vec<TrainPhase>,
}

impl RecordingBackend {
    fn new(val_losses: Vec<f64>) -> Self {
        Self {
            val_losses,
            epoch: 0,
            phase: TrainPhase::FullyUnfrozen,
            phases_by_epoch: Vec::new(),
        }
    }
}

impl TrainableModel for RecordingBackend {
    fn train_step(&mut self, _images: &Array4<f32>, labels: &[usize]) -> wildeye::Result<BatchMetrics> {
        self.epoch += 1;
        self.phases_by_epoch.push(self.phase);
        Ok(BatchMetrics {
            loss: 0.7,
            correct: labels.len(),
            total: labels.len(),
        })
    }

    fn eval_step(&mut self, _images: &Array4<f32>, labels: &[usize]) -> wildeye::Result<BatchMetrics> {
        let loss = self.val_losses[(self.epoch - 1).min(self.val_losses.len() - 1)];
        Ok(BatchMetrics {
            loss,
            correct: labels.len(),
            total: labels.len(),
        })
    }

    fn set_phase(&mut self, phase: TrainPhase) {
        self.phase = phase;
    }

    fn scale_learning_rate(&mut self, _factor: f64) {}

    fn export_weights(&self) -> wildeye::Result<Vec<u8>> {
        Ok(vec![0xAB, 0xCD])
    }

    fn export_optimizer_state(&self) -> wildeye::Result<Vec<u8>> {
        Ok(vec![0x01])
    }
}

fn options(dir: &Path, epochs: usize, unfreeze_at: usize) -> FitOptions {
    FitOptions {
        epochs,
        freeze_backbone: true,
        unfreeze_at_epoch: unfreeze_at,
        checkpoint_dir: dir.to_path_buf(),
    }
}

#[test]
fn backbone_unfreezes_at_epoch_ten_not_nine() {
    let dir = tempdir().unwrap();
    let losses: Vec<f64> = (0..12).map(|i| 1.0 - f64::from(i) * 0.02).collect();
    let mut trainer = Trainer::new(RecordingBackend::new(losses));

    trainer
        .fit(
            &TwoSampleBatches(1),
            &TwoSampleBatches(1),
            &options(dir.path(), 12, 10),
        )
        .unwrap();

    let backend = trainer.into_model();
    // phases_by_epoch[e - 1] is the phase epoch e trained under.
    assert_eq!(backend.phases_by_epoch[8], TrainPhase::BackboneFrozen);
    assert_eq!(backend.phases_by_epoch[9], TrainPhase::FullyUnfrozen);
}

#[test]
fn final_model_artifact_is_weights_only() {
    let dir = tempdir().unwrap();
    let model_dir = tempdir().unwrap();
    let mut trainer = Trainer::new(RecordingBackend::new(vec![0.9, 0.8, 0.7]));

    trainer
        .fit(
            &TwoSampleBatches(1),
            &TwoSampleBatches(1),
            &options(dir.path(), 3, 100),
        )
        .unwrap();

    let model_path = model_dir.path().join("wildlife_model.onnx");
    trainer.save_model(&model_path).unwrap();

    // Raw backend weights, no checkpoint framing.
    assert_eq!(std::fs::read(&model_path).unwrap(), vec![0xAB, 0xCD]);
}

#[test]
fn checkpoints_supersede_without_deleting_earlier_ones() {
    let dir = tempdir().unwrap();
    let mut trainer = Trainer::new(RecordingBackend::new(vec![0.9, 0.8, 0.7, 0.6]));

    trainer
        .fit(
            &TwoSampleBatches(1),
            &TwoSampleBatches(1),
            &options(dir.path(), 4, 100),
        )
        .unwrap();

    let mut checkpoints: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    checkpoints.sort();
    // Every epoch improved, so every epoch left a checkpoint behind.
    assert_eq!(checkpoints.len(), 4);

    let last = Checkpoint::load(checkpoints.last().unwrap()).unwrap();
    assert_eq!(last.epoch, 4);
    assert_eq!(last.history.len(), 4);
    assert_eq!(last.weights, vec![0xAB, 0xCD]);
    assert_eq!(last.optimizer_state, vec![0x01]);
}

#[test]
fn training_metrics_feed_drift_detection() {
    let metrics_dir = tempdir().unwrap();
    let mut monitor = ModelMonitor::new(metrics_dir.path()).unwrap();

    // Baseline accuracy 0.90, then ten evaluations at 0.80: the recent
    // window averages 0.80 and the regression is 0.10.
    monitor
        .record_metrics(
            BTreeMap::from([("accuracy".to_string(), 0.90)]),
            Some("resnet50_v1"),
        )
        .unwrap();
    for _ in 0..10 {
        monitor
            .record_metrics(BTreeMap::from([("accuracy".to_string(), 0.80)]), None)
            .unwrap();
    }

    let report = monitor.detect_drift(0.05);
    assert!(report.drift_detected);
    assert!((report.accuracy_drop - 0.10).abs() < 1e-9);
    assert!((report.recent_accuracy - 0.80).abs() < 1e-9);

    // A single-entry history refuses to conclude anything.
    let fresh_dir = tempdir().unwrap();
    let mut fresh = ModelMonitor::new(fresh_dir.path()).unwrap();
    fresh
        .record_metrics(BTreeMap::from([("accuracy".to_string(), 0.90)]), None)
        .unwrap();
    let report = fresh.detect_drift(0.05);
    assert!(!report.drift_detected);
    assert_eq!(report.reason.as_deref(), Some("insufficient data"));
}
