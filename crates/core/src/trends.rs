use std::collections::BTreeMap;

use chrono::Datelike;

use crate::{source::PricedUsage, types::CostTrend};

/// Groups priced usage by calendar month, oldest first.
///
/// Each row contributes `cost_per_seat * active_users`; rows without a
/// license still open their month but add nothing to it. Months with no rows
/// are not synthesized.
pub fn compute_cost_trends(rows: &[PricedUsage]) -> Vec<CostTrend> {
    let mut by_month: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for row in rows {
        let key = (row.record.date.year(), row.record.date.month());
        let cost = row.cost_per_seat.unwrap_or(0.0) * row.record.active_users as f64;
        *by_month.entry(key).or_insert(0.0) += cost;
    }

    let mut trends = Vec::with_capacity(by_month.len());
    let mut previous: Option<f64> = None;
    for ((year, month), total_cost) in by_month {
        trends.push(CostTrend {
            month: format!("{year:04}-{month:02}"),
            total_cost,
            growth_rate: previous.map_or(0.0, |prev| growth_rate(prev, total_cost)),
        });
        previous = Some(total_cost);
    }
    trends
}

/// Percentage change from `previous` to `current`; 0 when `previous` is 0.
pub fn growth_rate(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}
