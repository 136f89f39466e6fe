use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use std::{
    fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn acme() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/acme")
}

#[test]
fn cli_analyse_alias_writes_all_formats() {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let out_dir = format!("seatspend-out-all-{nonce}");

    let mut cmd = cargo_bin_cmd!("seatspend");
    cmd.env("NO_COLOR", "1").args([
        "analyse",
        "--input",
        acme().to_str().unwrap(),
        "--as-of",
        "2026-10-15",
        "--output-format",
        "all",
        "--out",
        &out_dir,
    ]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("PASS"))
        .stderr(predicate::str::contains("$11,400.00"));

    let out_path = std::path::Path::new(&out_dir);
    assert!(out_path.join("report.json").exists());

    let md = fs::read_to_string(out_path.join("report.md")).unwrap();
    assert!(md.contains("# seatspend report"));
    assert!(md.contains("### Unused Slack licenses"));
    assert!(md.contains("### Multiple design tools"));
    assert!(md.contains("| 2026-10 | 7950.00 |"));

    let _ = fs::remove_dir_all(&out_dir);
}

#[test]
fn cli_analyse_reads_org_and_windows_from_config() {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let out_dir = std::env::temp_dir().join(format!("seatspend-out-cfg-{nonce}"));
    let cfg_path = std::env::temp_dir().join(format!("seatspend-{nonce}.toml"));
    fs::write(&cfg_path, "trend_months = 2\nforecast_months = 1\n").unwrap();

    let mut cmd = cargo_bin_cmd!("seatspend");
    cmd.args([
        "analyse",
        "--input",
        acme().to_str().unwrap(),
        "--as-of",
        "2026-10-15",
        "--config",
        cfg_path.to_str().unwrap(),
        "--out",
        out_dir.to_str().unwrap(),
    ]);
    cmd.assert().success();

    let json = fs::read_to_string(out_dir.join("report.json")).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["cost_trends"].as_array().unwrap().len(), 2);
    assert_eq!(v["forecast"].as_array().unwrap().len(), 1);

    let _ = fs::remove_file(cfg_path);
    let _ = fs::remove_dir_all(&out_dir);
}

#[test]
fn cli_trends_rejects_zero_month_window() {
    let mut cmd = cargo_bin_cmd!("seatspend");
    cmd.args([
        "trends",
        "--input",
        acme().to_str().unwrap(),
        "--months",
        "0",
    ]);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("at least 1 month"));
}
