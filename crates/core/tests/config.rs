use std::io::Write;

use seatspend_core::config::Config;

#[test]
fn parse_valid_toml() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(
        f,
        r#"
organization_id = "org-acme"
trend_months = 12
forecast_months = 3
budget_ratio = 1.25
strict = true
"#
    )
    .unwrap();

    let cfg = Config::load(f.path()).unwrap();
    assert_eq!(cfg.organization_id.as_deref(), Some("org-acme"));
    assert_eq!(cfg.trend_months, Some(12));
    assert_eq!(cfg.forecast_months, Some(3));
    assert_eq!(cfg.budget_ratio, Some(1.25));
    assert_eq!(cfg.strict, Some(true));
}

#[test]
fn parse_empty_toml_gives_defaults() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "").unwrap();

    let cfg = Config::load(f.path()).unwrap();
    assert_eq!(cfg.organization_id, None);
    assert_eq!(cfg.trend_months, None);
    assert_eq!(cfg.forecast_months, None);
    assert_eq!(cfg.budget_ratio, None);
    assert_eq!(cfg.strict, None);
}

#[test]
fn parse_invalid_toml_returns_error() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "this is not valid [ toml {{{{").unwrap();

    let result = Config::load(f.path());
    assert!(result.is_err());
}

#[test]
fn negative_month_count_is_rejected() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "trend_months = -3").unwrap();

    assert!(Config::load(f.path()).is_err());
}

#[test]
fn discover_reads_config_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("seatspend.toml"), "forecast_months = 4\n").unwrap();

    let cfg = Config::discover_in(dir.path()).expect("config found");
    assert_eq!(cfg.forecast_months, Some(4));
}

#[test]
fn discover_skips_malformed_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("seatspend.toml"), "trend_months = \"six\"").unwrap();

    assert!(Config::discover_in(dir.path()).is_none());
}

#[test]
fn discover_without_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::discover_in(dir.path()).is_none());
}
