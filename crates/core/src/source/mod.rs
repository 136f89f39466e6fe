//! Read-only access to the persisted applications, licenses and usage rows.
//!
//! The analysis code only ever talks to a [`DataSource`]; [`Snapshot`] is the
//! on-disk implementation the CLI uses.

mod snapshot;
mod usage_log;

use anyhow::Context;
use chrono::{Months, NaiveDate};

use crate::types::{Application, License, UsageRecord};

pub use snapshot::Snapshot;
pub use usage_log::{parse_usage_jsonl, parse_usage_log, ParsedUsage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Strict,
    BestEffort,
}

impl ParseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Strict => "STRICT",
            ParseMode::BestEffort => "BEST_EFFORT",
        }
    }
}

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The `months` calendar months leading up to and including `end`.
    pub fn trailing_months(end: NaiveDate, months: u32) -> anyhow::Result<Self> {
        let start = end
            .checked_sub_months(Months::new(months))
            .with_context(|| format!("{months} months before {end} is out of range"))?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A usage row joined to the cost-per-seat of the license it was reported against.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedUsage {
    pub record: UsageRecord,
    pub cost_per_seat: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct LicenseUsage {
    pub license: License,
    pub application: Application,
    pub usage: Vec<UsageRecord>,
}

#[derive(Debug, Clone)]
pub struct ApplicationLicenses {
    pub application: Application,
    pub licenses: Vec<License>,
}

impl ApplicationLicenses {
    pub fn annual_cost(&self) -> f64 {
        self.licenses.iter().map(License::annual_cost).sum()
    }
}

/// Organization-scoped reads. Errors are handed back to the caller untouched.
pub trait DataSource {
    fn list_usage_records(
        &self,
        organization_id: &str,
        range: DateRange,
    ) -> anyhow::Result<Vec<PricedUsage>>;

    /// Active licenses only, each with every usage row recorded against it.
    fn list_active_licenses(&self, organization_id: &str) -> anyhow::Result<Vec<LicenseUsage>>;

    /// Every application with its active licenses.
    fn list_applications(&self, organization_id: &str)
        -> anyhow::Result<Vec<ApplicationLicenses>>;
}

impl<T: DataSource + ?Sized> DataSource for &T {
    fn list_usage_records(
        &self,
        organization_id: &str,
        range: DateRange,
    ) -> anyhow::Result<Vec<PricedUsage>> {
        (**self).list_usage_records(organization_id, range)
    }

    fn list_active_licenses(&self, organization_id: &str) -> anyhow::Result<Vec<LicenseUsage>> {
        (**self).list_active_licenses(organization_id)
    }

    fn list_applications(
        &self,
        organization_id: &str,
    ) -> anyhow::Result<Vec<ApplicationLicenses>> {
        (**self).list_applications(organization_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_window_is_inclusive() {
        let end = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let range = DateRange::trailing_months(end, 6).unwrap();

        assert_eq!(range.start, NaiveDate::from_ymd_opt(2026, 4, 15).unwrap());
        assert!(range.contains(range.start));
        assert!(range.contains(end));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2026, 4, 14).unwrap()));
    }

    #[test]
    fn trailing_window_clamps_to_month_end() {
        let end = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let range = DateRange::trailing_months(end, 1).unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }
}
