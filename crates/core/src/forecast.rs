//! Cost projection from the month-over-month growth of the trend series.
//!
//! The last observed month is compounded forward at the mean growth rate.
//! Confidence starts at 90 and loses two points per unit of growth-rate
//! variance, never dropping below 20.

use anyhow::Context;
use chrono::{Datelike, Months, NaiveDate};

use crate::types::{CostForecast, CostTrend};

/// Lookback used to build the series a forecast is projected from.
pub const FORECAST_LOOKBACK_MONTHS: u32 = 12;
/// Months of history required before projecting anything.
pub const MIN_TREND_MONTHS: usize = 3;

pub const BASE_CONFIDENCE: f64 = 90.0;
pub const MIN_CONFIDENCE: f64 = 20.0;
pub const VARIANCE_PENALTY: f64 = 2.0;

/// Mean monthly growth (percent) above which spend is flagged as growing fast.
pub const HIGH_GROWTH_THRESHOLD: f64 = 5.0;
/// Mean monthly growth (percent) below which spend is flagged as declining.
pub const DECLINE_THRESHOLD: f64 = -2.0;

pub const INSUFFICIENT_DATA_PERIOD: &str = "insufficient-data";

impl CostForecast {
    pub fn insufficient_data() -> Self {
        Self {
            period: INSUFFICIENT_DATA_PERIOD.to_string(),
            predicted_cost: 0.0,
            confidence: 0.0,
            factors: vec![format!(
                "Fewer than {MIN_TREND_MONTHS} months of cost history available"
            )],
            recommendations: vec![
                "Keep usage data flowing for a few more months before relying on forecasts"
                    .to_string(),
            ],
        }
    }

    pub fn is_insufficient_data(&self) -> bool {
        self.period == INSUFFICIENT_DATA_PERIOD
    }
}

/// Projects the `months` calendar months that follow `as_of`.
///
/// Each period compounds the last entry of `trends` once per month between
/// that entry and the period, so a series that stops before `as_of` still
/// yields future periods. Returns a single [`CostForecast::insufficient_data`]
/// entry when the series is shorter than [`MIN_TREND_MONTHS`].
pub fn project_forecast(
    trends: &[CostTrend],
    as_of: NaiveDate,
    months: u32,
) -> anyhow::Result<Vec<CostForecast>> {
    let Some(last) = trends.last() else {
        return Ok(vec![CostForecast::insufficient_data()]);
    };
    if trends.len() < MIN_TREND_MONTHS {
        return Ok(vec![CostForecast::insufficient_data()]);
    }

    let rates: Vec<f64> = trends[1..].iter().map(|t| t.growth_rate).collect();
    let mean = mean(&rates);
    let confidence = forecast_confidence(variance(&rates, mean));
    let (factors, recommendations) = growth_commentary(mean);

    let last_month = parse_month(&last.month)?;
    let anchor = first_of_month(as_of).max(last_month);
    let growth = 1.0 + mean / 100.0;

    (1..=months)
        .map(|k| -> anyhow::Result<CostForecast> {
            let period = anchor
                .checked_add_months(Months::new(k))
                .with_context(|| format!("{k} months after {anchor} is out of range"))?;
            let steps = month_index(period) - month_index(last_month);
            Ok(CostForecast {
                period: period.format("%Y-%m").to_string(),
                predicted_cost: (last.total_cost * growth.powi(steps)).max(0.0),
                confidence,
                factors: factors.clone(),
                recommendations: recommendations.clone(),
            })
        })
        .collect()
}

pub fn forecast_confidence(variance: f64) -> f64 {
    (BASE_CONFIDENCE - VARIANCE_PENALTY * variance).clamp(MIN_CONFIDENCE, BASE_CONFIDENCE)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population variance.
fn variance(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
    }
}

fn growth_commentary(mean_growth: f64) -> (Vec<String>, Vec<String>) {
    if mean_growth > HIGH_GROWTH_THRESHOLD {
        (
            vec![format!(
                "High growth rate detected: {mean_growth:.1}% per month on average"
            )],
            vec![
                "Review recent license purchases and seat increases".to_string(),
                "Negotiate volume discounts with the fastest growing vendors".to_string(),
            ],
        )
    } else if mean_growth < DECLINE_THRESHOLD {
        (
            vec![format!(
                "Spend is declining: {mean_growth:.1}% per month on average"
            )],
            vec!["Confirm that the reduced tooling still covers team needs".to_string()],
        )
    } else {
        (
            vec![format!(
                "Stable spending pattern: {mean_growth:.1}% per month on average"
            )],
            vec!["Keep monitoring utilization ahead of renewals".to_string()],
        )
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn parse_month(month: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .with_context(|| format!("invalid month {month}"))
}
