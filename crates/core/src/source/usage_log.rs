use std::io::BufRead;

use anyhow::Context;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::types::UsageRecord;

use super::ParseMode;

#[derive(Debug, Clone, Default)]
pub struct ParsedUsage {
    pub records: Vec<UsageRecord>,
    pub skipped: usize,
}

static RE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{4}-\d{2}-\d{2})\s+(.+?)\s*$").expect("valid regex"));

static RE_KV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(application|license|active_users)\s*=\s*(\S+)").expect("valid regex")
});

/// Parses connector export lines such as
/// `2026-09-01 application=app-slack license=lic-slack active_users=42`.
pub fn parse_usage_log<R: BufRead>(r: &mut R, mode: ParseMode) -> anyhow::Result<ParsedUsage> {
    let mut parsed = ParsedUsage::default();

    let mut line = String::new();
    let mut line_no = 0usize;
    loop {
        line.clear();
        let n = r.read_line(&mut line).context("read_line")?;
        if n == 0 {
            break;
        }
        line_no += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match parse_log_line(trimmed) {
            Ok(record) => parsed.records.push(record),
            Err(reason) => reject(mode, line_no, &reason, &mut parsed)?,
        }
    }

    Ok(parsed)
}

fn parse_log_line(line: &str) -> Result<UsageRecord, String> {
    let cap = RE_LINE
        .captures(line)
        .ok_or_else(|| "expected `YYYY-MM-DD key=value ...`".to_string())?;
    let date = NaiveDate::parse_from_str(&cap[1], "%Y-%m-%d")
        .map_err(|e| format!("bad date {}: {e}", &cap[1]))?;

    let mut application_id = None;
    let mut license_id = None;
    let mut active_users = None;
    for kv in RE_KV.captures_iter(&cap[2]) {
        let value = kv[2].to_string();
        match kv[1].to_ascii_lowercase().as_str() {
            "application" => application_id = Some(value),
            "license" => license_id = Some(value),
            "active_users" => {
                let n = value
                    .replace('_', "")
                    .parse::<u32>()
                    .map_err(|e| format!("bad active_users {value}: {e}"))?;
                active_users = Some(n);
            }
            _ => {}
        }
    }

    Ok(UsageRecord {
        application_id: application_id.ok_or_else(|| "missing application=".to_string())?,
        license_id,
        date,
        active_users: active_users.ok_or_else(|| "missing active_users=".to_string())?,
    })
}

/// One `UsageRecord` JSON object per line.
pub fn parse_usage_jsonl<R: BufRead>(r: &mut R, mode: ParseMode) -> anyhow::Result<ParsedUsage> {
    let mut parsed = ParsedUsage::default();

    let mut line = String::new();
    let mut line_no = 0usize;
    loop {
        line.clear();
        let n = r.read_line(&mut line).context("read_line")?;
        if n == 0 {
            break;
        }
        line_no += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<UsageRecord>(trimmed) {
            Ok(record) => parsed.records.push(record),
            Err(e) => reject(mode, line_no, &e.to_string(), &mut parsed)?,
        }
    }

    Ok(parsed)
}

fn reject(
    mode: ParseMode,
    line_no: usize,
    reason: &str,
    parsed: &mut ParsedUsage,
) -> anyhow::Result<()> {
    if mode == ParseMode::Strict {
        anyhow::bail!("malformed usage line {line_no}: {reason}");
    }
    warn!(line = line_no, reason, "skipping malformed usage line");
    parsed.skipped += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn log_line_without_license_is_accepted() {
        let input = b"2026-09-01 application=app-figma active_users=7\n";
        let parsed = parse_usage_log(&mut Cursor::new(&input[..]), ParseMode::Strict).unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].license_id, None);
        assert_eq!(parsed.records[0].active_users, 7);
    }

    #[test]
    fn keys_are_case_insensitive_and_order_free() {
        let input = b"2026-09-02 ACTIVE_USERS=1_200 License=lic-1 application=app-1\n";
        let parsed = parse_usage_log(&mut Cursor::new(&input[..]), ParseMode::Strict).unwrap();

        let rec = &parsed.records[0];
        assert_eq!(rec.application_id, "app-1");
        assert_eq!(rec.license_id.as_deref(), Some("lic-1"));
        assert_eq!(rec.active_users, 1200);
    }

    #[test]
    fn best_effort_counts_skipped_lines() {
        let input = b"# export\ngarbage\n2026-13-01 application=a active_users=1\n2026-09-03 application=a active_users=2\n";
        let parsed = parse_usage_log(&mut Cursor::new(&input[..]), ParseMode::BestEffort).unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.skipped, 2);
    }

    #[test]
    fn strict_mode_reports_line_number() {
        let input = b"2026-09-01 application=a active_users=1\n2026-09-02 application=a\n";
        let err = parse_usage_log(&mut Cursor::new(&input[..]), ParseMode::Strict).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn jsonl_rejects_negative_active_users() {
        let input = br#"{"application_id":"a","date":"2026-09-01","active_users":-1}"#;
        let err = parse_usage_jsonl(&mut Cursor::new(&input[..]), ParseMode::Strict).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
