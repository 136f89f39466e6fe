use crate::{
    rules::RECENT_USAGE_WINDOW,
    source::LicenseUsage,
    types::{LicenseUtilization, UsageRecord},
};

/// Scores every license, highest utilization first.
///
/// Equal rates fall back to application name, then license id, so the order
/// does not depend on how the source returned its rows.
pub fn score_utilization(licenses: &[LicenseUsage]) -> Vec<LicenseUtilization> {
    let mut scored: Vec<LicenseUtilization> = licenses.iter().map(score_license).collect();
    scored.sort_by(|a, b| {
        b.utilization_rate
            .total_cmp(&a.utilization_rate)
            .then_with(|| a.application_name.cmp(&b.application_name))
            .then_with(|| a.license_id.cmp(&b.license_id))
    });
    scored
}

pub fn score_license(entry: &LicenseUsage) -> LicenseUtilization {
    let average = recent_average(&entry.usage);
    let total = entry.license.total_seats;
    let used = average.round() as u32;

    let utilization_rate = if total == 0 {
        0.0
    } else {
        average * 100.0 / total as f64
    };

    LicenseUtilization {
        license_id: entry.license.id.clone(),
        application_id: entry.application.id.clone(),
        application_name: entry.application.name.clone(),
        total_licenses: total,
        used_licenses: used,
        utilization_rate,
        inactive_users: total.saturating_sub(used),
    }
}

/// Mean active users over the most recent records, 0 with no records.
fn recent_average(usage: &[UsageRecord]) -> f64 {
    let mut recent: Vec<&UsageRecord> = usage.iter().collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(RECENT_USAGE_WINDOW);

    if recent.is_empty() {
        return 0.0;
    }
    let sum: u64 = recent.iter().map(|r| r.active_users as u64).sum();
    sum as f64 / recent.len() as f64
}
