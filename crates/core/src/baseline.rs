use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::Context;

/// Spend level of a previous report to compare the current run against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub baseline_monthly_cost: f64,
}

impl Baseline {
    pub fn from_report_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let v: serde_json::Value = serde_json::from_slice(bytes).context("parse json")?;
        let cost = v
            .get("summary")
            .and_then(|s| s.get("latest_monthly_cost"))
            .and_then(|n| n.as_f64())
            .unwrap_or(0.0);
        Ok(Self {
            baseline_monthly_cost: cost,
        })
    }

    pub fn load_json(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_report_json(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_from_report_json_defaults_to_zero() {
        let bytes = br#"{"summary":{}}"#;
        let baseline = Baseline::from_report_json(bytes).unwrap();
        assert_eq!(baseline.baseline_monthly_cost, 0.0);
    }

    #[test]
    fn baseline_reads_latest_monthly_cost() {
        let bytes = br#"{"summary":{"latest_monthly_cost":1250.5}}"#;
        let baseline = Baseline::from_report_json(bytes).unwrap();
        assert_eq!(baseline.baseline_monthly_cost, 1250.5);
    }

    #[test]
    fn baseline_rejects_invalid_json() {
        assert!(Baseline::from_report_json(b"not json").is_err());
    }
}
