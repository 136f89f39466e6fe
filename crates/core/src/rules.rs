use std::collections::{BTreeMap, HashMap};

use crate::{
    source::{ApplicationLicenses, LicenseUsage},
    types::{AppCategory, License, LicenseUtilization, OpportunityType, Priority, SavingsOpportunity},
};

/// Usage records averaged per license.
pub const RECENT_USAGE_WINDOW: usize = 30;

/// Below this utilization (percent) a license counts as unused.
pub const UNUSED_UTILIZATION_THRESHOLD: f64 = 10.0;
/// Below this utilization (percent) a license counts as underutilized.
pub const UNDERUTILIZED_UTILIZATION_THRESHOLD: f64 = 50.0;
/// Share of inactive seats assumed releasable for underutilized apps.
pub const UNDERUTILIZED_REDUCTION_FACTOR: f64 = 0.7;
/// Combined annual spend a category must exceed to flag overlapping tools.
pub const DUPLICATE_SPEND_THRESHOLD: f64 = 10_000.0;
/// Share of combined category spend assumed recoverable by consolidating.
pub const DUPLICATE_OVERLAP_FACTOR: f64 = 0.3;

pub const UNUSED_LICENSE_CONFIDENCE: u8 = 85;
pub const UNDERUTILIZED_APP_CONFIDENCE: u8 = 70;
pub const DUPLICATE_FUNCTIONALITY_CONFIDENCE: u8 = 60;

pub const HIGH_PRIORITY_SAVINGS: f64 = 5_000.0;
pub const MEDIUM_PRIORITY_SAVINGS: f64 = 1_000.0;

/// Runs the unused, underutilized and duplicate-functionality passes and
/// returns every hit, largest potential savings first.
pub fn find_opportunities(
    utilization: &[LicenseUtilization],
    licenses: &[LicenseUsage],
    applications: &[ApplicationLicenses],
) -> Vec<SavingsOpportunity> {
    let by_id: HashMap<&str, &License> = licenses
        .iter()
        .map(|l| (l.license.id.as_str(), &l.license))
        .collect();

    let mut opportunities: Vec<SavingsOpportunity> = Vec::new();

    for u in utilization {
        let Some(license) = by_id.get(u.license_id.as_str()) else {
            continue;
        };
        if let Some(o) = unused_license(u, license) {
            opportunities.push(o);
        } else if let Some(o) = underutilized_app(u, license) {
            opportunities.push(o);
        }
    }

    opportunities.extend(duplicate_functionality(applications));

    opportunities.sort_by(|a, b| b.potential_savings.total_cmp(&a.potential_savings));
    opportunities
}

pub fn savings_priority(annual_savings: f64) -> Priority {
    if annual_savings > HIGH_PRIORITY_SAVINGS {
        Priority::High
    } else if annual_savings > MEDIUM_PRIORITY_SAVINGS {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn annual_seat_savings(license: &License, seats: u32) -> f64 {
    license.cost_per_seat * seats as f64 * license.billing_cycle.annualization_factor()
}

fn unused_license(u: &LicenseUtilization, license: &License) -> Option<SavingsOpportunity> {
    if u.utilization_rate >= UNUSED_UTILIZATION_THRESHOLD {
        return None;
    }

    let potential_savings = annual_seat_savings(license, u.inactive_users);
    Some(SavingsOpportunity {
        kind: OpportunityType::UnusedLicense,
        title: format!("Unused {} licenses", u.application_name),
        description: format!(
            "{} of {} seats inactive ({:.1}% utilization)",
            u.inactive_users, u.total_licenses, u.utilization_rate
        ),
        application_ids: vec![u.application_id.clone()],
        potential_savings,
        priority: savings_priority(potential_savings),
        confidence: UNUSED_LICENSE_CONFIDENCE,
        action_required: format!(
            "Cancel or reassign {} inactive {} seats",
            u.inactive_users, u.application_name
        ),
    })
}

fn underutilized_app(u: &LicenseUtilization, license: &License) -> Option<SavingsOpportunity> {
    if !(UNUSED_UTILIZATION_THRESHOLD..UNDERUTILIZED_UTILIZATION_THRESHOLD)
        .contains(&u.utilization_rate)
    {
        return None;
    }

    let reduction = (u.inactive_users as f64 * UNDERUTILIZED_REDUCTION_FACTOR).floor() as u32;
    Some(SavingsOpportunity {
        kind: OpportunityType::UnderutilizedApp,
        title: format!("Underutilized {}", u.application_name),
        description: format!(
            "{} of {} seats in use ({:.1}% utilization)",
            u.used_licenses, u.total_licenses, u.utilization_rate
        ),
        application_ids: vec![u.application_id.clone()],
        potential_savings: annual_seat_savings(license, reduction),
        priority: Priority::Medium,
        confidence: UNDERUTILIZED_APP_CONFIDENCE,
        action_required: format!(
            "Reduce {} by {} seats at the next renewal",
            u.application_name, reduction
        ),
    })
}

fn duplicate_functionality(applications: &[ApplicationLicenses]) -> Vec<SavingsOpportunity> {
    let mut by_category: BTreeMap<AppCategory, Vec<&ApplicationLicenses>> = BTreeMap::new();
    for app in applications {
        if app.application.category.is_consolidation_candidate() {
            by_category
                .entry(app.application.category)
                .or_default()
                .push(app);
        }
    }

    by_category
        .into_iter()
        .filter(|(_, apps)| apps.len() > 1)
        .filter_map(|(category, apps)| {
            let combined: f64 = apps.iter().map(|a| a.annual_cost()).sum();
            if combined <= DUPLICATE_SPEND_THRESHOLD {
                return None;
            }

            let names: Vec<&str> = apps.iter().map(|a| a.application.name.as_str()).collect();
            Some(SavingsOpportunity {
                kind: OpportunityType::DuplicateFunctionality,
                title: format!("Multiple {} tools", category.as_str()),
                description: format!(
                    "{} apps overlap: {} (${:.2} per year combined)",
                    apps.len(),
                    names.join(", "),
                    combined
                ),
                application_ids: apps.iter().map(|a| a.application.id.clone()).collect(),
                potential_savings: combined * DUPLICATE_OVERLAP_FACTOR,
                priority: Priority::Medium,
                confidence: DUPLICATE_FUNCTIONALITY_CONFIDENCE,
                action_required: format!(
                    "Consolidate {} tools onto a single vendor",
                    category.as_str()
                ),
            })
        })
        .collect()
}
