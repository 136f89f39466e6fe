use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use std::{
    fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn fixture(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}

fn nonce() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

#[test]
fn cli_analyze_writes_report_and_exits_0_without_budget() {
    let out_dir = std::env::temp_dir().join(format!("seatspend-out-{}", nonce()));

    let mut cmd = cargo_bin_cmd!("seatspend");
    cmd.args([
        "analyze",
        "--input",
        fixture("acme").to_str().unwrap(),
        "--as-of",
        "2026-10-15",
        "--out",
        out_dir.to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("latest_monthly_cost=7950.00"))
        .stdout(predicate::str::contains("opportunities=5"));

    let json = fs::read_to_string(out_dir.join("report.json")).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["inputs"]["organization_id"], "org-acme");
    assert_eq!(v["opportunities"][0]["type"], "unused_license");
    assert_eq!(v["opportunities"][0]["priority"], "high");
    assert!(!out_dir.join("report.md").exists());

    let _ = fs::remove_dir_all(&out_dir);
}

#[test]
fn cli_analyze_exits_2_when_budget_fails() {
    let baseline_path = std::env::temp_dir().join(format!("seatspend-baseline-{}.json", nonce()));
    let out_dir = std::env::temp_dir().join(format!("seatspend-out-{}", nonce()));
    fs::write(&baseline_path, r#"{"summary":{"latest_monthly_cost":1000.0}}"#).unwrap();

    let mut cmd = cargo_bin_cmd!("seatspend");
    cmd.args([
        "analyze",
        "--input",
        fixture("acme").to_str().unwrap(),
        "--as-of",
        "2026-10-15",
        "--baseline",
        baseline_path.to_str().unwrap(),
        "--budget-ratio",
        "1.25",
        "--out",
        out_dir.to_str().unwrap(),
    ]);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("BUDGET FAILED"));

    let _ = fs::remove_file(baseline_path);
    let _ = fs::remove_dir_all(&out_dir);
}

#[test]
fn cli_analyze_errors_on_missing_input() {
    let mut cmd = cargo_bin_cmd!("seatspend");
    cmd.args([
        "analyze",
        "--input",
        "does-not-exist",
        "--out",
        "seatspend-out-test",
    ]);
    cmd.assert().failure().code(1);
}

#[test]
fn cli_opportunities_prints_success_envelope() {
    let mut cmd = cargo_bin_cmd!("seatspend");
    cmd.args([
        "opportunities",
        "--input",
        fixture("acme").to_str().unwrap(),
        "--as-of",
        "2026-10-15",
    ]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(v["success"], true);
    assert_eq!(v["data"].as_array().unwrap().len(), 5);
    assert_eq!(v["data"][4]["type"], "underutilized_app");
}

#[test]
fn cli_forecast_reports_insufficient_data() {
    let mut cmd = cargo_bin_cmd!("seatspend");
    cmd.args([
        "forecast",
        "--input",
        fixture("two_orgs").to_str().unwrap(),
        "--org",
        "org-north",
        "--as-of",
        "2026-10-15",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"period\": \"insufficient-data\""));
}

#[test]
fn cli_requires_org_when_snapshot_is_ambiguous() {
    let mut cmd = cargo_bin_cmd!("seatspend");
    cmd.args(["utilization", "--input", fixture("two_orgs").to_str().unwrap()]);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("pass an organization id"));
}
