use chrono::NaiveDate;
use tracing::debug;

use crate::{
    forecast::{project_forecast, FORECAST_LOOKBACK_MONTHS},
    rules::find_opportunities,
    source::{DataSource, DateRange, LicenseUsage},
    trends::compute_cost_trends,
    types::{CostForecast, CostTrend, LicenseUtilization, SavingsOpportunity},
    utilization::score_utilization,
};

pub const DEFAULT_TREND_MONTHS: u32 = 6;
pub const DEFAULT_FORECAST_MONTHS: u32 = 6;

/// Cost and utilization analysis over a [`DataSource`].
///
/// Holds no state between calls beyond the source and the `as_of` date that
/// anchors every lookback window. Source errors are returned as-is.
#[derive(Debug, Clone)]
pub struct AnalysisEngine<S> {
    source: S,
    as_of: NaiveDate,
}

impl<S: DataSource> AnalysisEngine<S> {
    pub fn new(source: S, as_of: NaiveDate) -> Self {
        Self { source, as_of }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn analyze_cost_trends(
        &self,
        organization_id: &str,
        months: u32,
    ) -> anyhow::Result<Vec<CostTrend>> {
        anyhow::ensure!(months >= 1, "trend window must be at least 1 month");

        let range = DateRange::trailing_months(self.as_of, months)?;
        let rows = self.source.list_usage_records(organization_id, range)?;
        let trends = compute_cost_trends(&rows);

        debug!(
            organization_id,
            rows = rows.len(),
            months = trends.len(),
            "computed cost trends"
        );
        Ok(trends)
    }

    pub fn analyze_license_utilization(
        &self,
        organization_id: &str,
    ) -> anyhow::Result<Vec<LicenseUtilization>> {
        let licenses = self.active_licenses(organization_id)?;
        let scored = score_utilization(&licenses);

        debug!(organization_id, licenses = scored.len(), "scored utilization");
        Ok(scored)
    }

    pub fn identify_savings_opportunities(
        &self,
        organization_id: &str,
    ) -> anyhow::Result<Vec<SavingsOpportunity>> {
        let licenses = self.active_licenses(organization_id)?;
        let scored = score_utilization(&licenses);
        let applications = self.source.list_applications(organization_id)?;
        let opportunities = find_opportunities(&scored, &licenses, &applications);

        debug!(
            organization_id,
            opportunities = opportunities.len(),
            "identified savings opportunities"
        );
        Ok(opportunities)
    }

    pub fn generate_cost_forecast(
        &self,
        organization_id: &str,
        months: u32,
    ) -> anyhow::Result<Vec<CostForecast>> {
        anyhow::ensure!(months >= 1, "forecast horizon must be at least 1 month");

        let trends = self.analyze_cost_trends(organization_id, FORECAST_LOOKBACK_MONTHS)?;
        let forecast = project_forecast(&trends, self.as_of, months)?;

        debug!(
            organization_id,
            history = trends.len(),
            entries = forecast.len(),
            "generated cost forecast"
        );
        Ok(forecast)
    }

    /// Active licenses with usage dated after `as_of` dropped.
    fn active_licenses(&self, organization_id: &str) -> anyhow::Result<Vec<LicenseUsage>> {
        let mut licenses = self.source.list_active_licenses(organization_id)?;
        for entry in &mut licenses {
            entry.usage.retain(|r| r.date <= self.as_of);
        }
        Ok(licenses)
    }
}
