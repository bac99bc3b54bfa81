//! CLI argument validation tests.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_predict_requires_image_or_directory() {
    let mut cmd = cargo_bin_cmd!("wildeye");
    cmd.arg("predict")
        .arg("--model-path")
        .arg("model.onnx")
        .arg("--species-map")
        .arg("species.json");

    cmd.assert().failure().stderr(predicate::str::contains(
        "required arguments were not provided",
    ));
}

#[test]
fn test_predict_rejects_image_and_directory_together() {
    let mut cmd = cargo_bin_cmd!("wildeye");
    cmd.arg("predict")
        .arg("--image")
        .arg("photo.jpg")
        .arg("--directory")
        .arg("photos/");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_predict_rejects_out_of_range_confidence() {
    let mut cmd = cargo_bin_cmd!("wildeye");
    cmd.arg("predict")
        .arg("--image")
        .arg("photo.jpg")
        .arg("--confidence-threshold")
        .arg("1.5");

    cmd.assert().failure().stderr(predicate::str::contains(
        "confidence must be between 0.0 and 1.0",
    ));
}

#[test]
fn test_metrics_drift_rejects_bad_threshold() {
    let mut cmd = cargo_bin_cmd!("wildeye");
    cmd.arg("metrics").arg("drift").arg("--threshold").arg("abc");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not a valid number"));
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("wildeye");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("predict"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("metrics"))
        .stdout(predicate::str::contains("config"));
}
