pub mod baseline;
pub mod config;
pub mod engine;
pub mod forecast;
pub mod report;
pub mod rules;
pub mod source;
pub mod trends;
pub mod types;
pub mod utilization;

use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::{
    baseline::Baseline,
    engine::{AnalysisEngine, DEFAULT_FORECAST_MONTHS, DEFAULT_TREND_MONTHS},
    report::{compare_to_baseline, evaluate_budget, AnalysisReport, Inputs},
    source::{DataSource, ParseMode, Snapshot},
};

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Required when the snapshot holds more than one organization.
    pub organization_id: Option<String>,
    pub as_of: NaiveDate,
    pub trend_months: u32,
    pub forecast_months: u32,
    pub strict: bool,
    pub baseline_path: Option<std::path::PathBuf>,
    pub budget_ratio: Option<f64>,
    pub max_total_bytes_scanned: u64,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            organization_id: None,
            as_of: Utc::now().date_naive(),
            trend_months: DEFAULT_TREND_MONTHS,
            forecast_months: DEFAULT_FORECAST_MONTHS,
            strict: false,
            baseline_path: None,
            budget_ratio: None,
            max_total_bytes_scanned: 50 * 1024 * 1024,
        }
    }
}

impl AnalyzeOptions {
    pub fn parse_mode(&self) -> ParseMode {
        if self.strict {
            ParseMode::Strict
        } else {
            ParseMode::BestEffort
        }
    }
}

/// Loads the snapshot at `input`, runs every analysis and applies the
/// baseline comparison and budget gate when configured.
pub fn analyze_dir(input: &Path, opts: AnalyzeOptions) -> anyhow::Result<AnalysisReport> {
    let parse_mode = opts.parse_mode();
    let snapshot = Snapshot::load_dir(input, parse_mode, opts.max_total_bytes_scanned)
        .with_context(|| format!("failed to load snapshot at {}", input.display()))?;

    let organization_id = resolve_organization(&snapshot, opts.organization_id.as_deref())?;
    info!(
        organization_id = %organization_id,
        usage_records = snapshot.usage.len(),
        "analyzing snapshot"
    );

    let inputs = Inputs {
        organization_id: organization_id.clone(),
        as_of: opts.as_of,
        input_path: input.display().to_string(),
        parse_mode: parse_mode.as_str().to_string(),
        sources: snapshot.sources.clone(),
    };
    let mut report = analyze_source(&snapshot, inputs, &opts)?;

    let baseline = if let Some(p) = &opts.baseline_path {
        Some(
            Baseline::load_json(p)
                .with_context(|| format!("failed to load baseline {}", p.display()))?,
        )
    } else {
        None
    };

    report.baseline_comparison = baseline
        .as_ref()
        .map(|b| compare_to_baseline(b, &report.summary));

    report.budget = match (opts.budget_ratio, report.baseline_comparison.as_ref()) {
        (Some(threshold), Some(cmp)) => Some(evaluate_budget(threshold, cmp)),
        _ => None,
    };

    Ok(report)
}

/// Runs the four analyses for `inputs.organization_id` and composes them.
pub fn analyze_source<S: DataSource>(
    source: S,
    inputs: Inputs,
    opts: &AnalyzeOptions,
) -> anyhow::Result<AnalysisReport> {
    let engine = AnalysisEngine::new(source, opts.as_of);
    let org = inputs.organization_id.as_str();

    let cost_trends = engine.analyze_cost_trends(org, opts.trend_months)?;
    let utilization = engine.analyze_license_utilization(org)?;
    let opportunities = engine.identify_savings_opportunities(org)?;
    let forecast = engine.generate_cost_forecast(org, opts.forecast_months)?;

    Ok(AnalysisReport::new(
        inputs,
        cost_trends,
        utilization,
        opportunities,
        forecast,
    ))
}

/// Picks the organization to analyze: the requested one, or the only one
/// present in the snapshot.
pub fn resolve_organization(
    snapshot: &Snapshot,
    requested: Option<&str>,
) -> anyhow::Result<String> {
    if let Some(org) = requested {
        return Ok(org.to_string());
    }

    let orgs = snapshot.organizations();
    match orgs.len() {
        1 => Ok(orgs.into_iter().next().unwrap_or_default().to_string()),
        0 => anyhow::bail!("snapshot contains no applications; pass an organization id"),
        n => anyhow::bail!(
            "snapshot contains {n} organizations ({}); pass an organization id",
            orgs.into_iter().collect::<Vec<_>>().join(", ")
        ),
    }
}
