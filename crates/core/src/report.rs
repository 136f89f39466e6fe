use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    baseline::Baseline,
    types::{CostForecast, CostTrend, LicenseUtilization, SavingsOpportunity},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_version: String,
    pub inputs: Inputs,
    pub summary: Summary,
    pub cost_trends: Vec<CostTrend>,
    pub utilization: Vec<LicenseUtilization>,
    pub opportunities: Vec<SavingsOpportunity>,
    pub forecast: Vec<CostForecast>,
    pub baseline_comparison: Option<BaselineComparison>,
    pub budget: Option<BudgetResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inputs {
    pub organization_id: String,
    pub as_of: NaiveDate,
    pub input_path: String,
    pub parse_mode: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub latest_monthly_cost: f64,
    pub average_utilization: f64,
    pub total_potential_savings: f64,
    pub opportunity_count: usize,
}

impl Summary {
    pub fn from_parts(
        trends: &[CostTrend],
        utilization: &[LicenseUtilization],
        opportunities: &[SavingsOpportunity],
    ) -> Self {
        let average_utilization = if utilization.is_empty() {
            0.0
        } else {
            utilization.iter().map(|u| u.utilization_rate).sum::<f64>() / utilization.len() as f64
        };

        Self {
            latest_monthly_cost: trends.last().map_or(0.0, |t| t.total_cost),
            average_utilization,
            total_potential_savings: opportunities.iter().map(|o| o.potential_savings).sum(),
            opportunity_count: opportunities.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub baseline_monthly_cost: f64,
    pub regression_ratio: f64,
    pub delta_monthly_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetResult {
    pub threshold_regression_ratio: f64,
    pub pass: bool,
    pub reason: String,
}

impl AnalysisReport {
    pub fn new(
        inputs: Inputs,
        cost_trends: Vec<CostTrend>,
        utilization: Vec<LicenseUtilization>,
        opportunities: Vec<SavingsOpportunity>,
        forecast: Vec<CostForecast>,
    ) -> Self {
        Self {
            report_version: "0.1.0".to_string(),
            inputs,
            summary: Summary::from_parts(&cost_trends, &utilization, &opportunities),
            cost_trends,
            utilization,
            opportunities,
            forecast,
            baseline_comparison: None,
            budget: None,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut s = String::new();
        s.push_str("# seatspend report\n\n");
        s.push_str(&format!("- report_version: `{}`\n", self.report_version));
        s.push_str(&format!(
            "- organization_id: `{}`\n",
            self.inputs.organization_id
        ));
        s.push_str(&format!("- as_of: `{}`\n", self.inputs.as_of));
        s.push_str(&format!("- input_path: `{}`\n", self.inputs.input_path));
        s.push_str(&format!("- parse_mode: `{}`\n", self.inputs.parse_mode));
        s.push('\n');

        s.push_str("## Summary\n\n");
        s.push_str(&format!(
            "- latest_monthly_cost: `{:.2}`\n",
            self.summary.latest_monthly_cost
        ));
        s.push_str(&format!(
            "- average_utilization: `{:.1}%`\n",
            self.summary.average_utilization
        ));
        s.push_str(&format!(
            "- total_potential_savings: `{:.2}`\n",
            self.summary.total_potential_savings
        ));
        s.push_str(&format!(
            "- opportunity_count: `{}`\n",
            self.summary.opportunity_count
        ));
        s.push('\n');

        s.push_str("## Cost trends\n\n");
        if self.cost_trends.is_empty() {
            s.push_str("- (no usage in window)\n");
        } else {
            s.push_str("| month | total_cost | growth_rate |\n|---|---:|---:|\n");
            for t in &self.cost_trends {
                s.push_str(&format!(
                    "| {} | {:.2} | {:.1}% |\n",
                    t.month, t.total_cost, t.growth_rate
                ));
            }
        }
        s.push('\n');

        s.push_str("## License utilization\n\n");
        if self.utilization.is_empty() {
            s.push_str("- (no active licenses)\n");
        } else {
            s.push_str("| application | seats | used | inactive | utilization |\n");
            s.push_str("|---|---:|---:|---:|---:|\n");
            for u in &self.utilization {
                s.push_str(&format!(
                    "| {} | {} | {} | {} | {:.1}% |\n",
                    u.application_name,
                    u.total_licenses,
                    u.used_licenses,
                    u.inactive_users,
                    u.utilization_rate
                ));
            }
        }
        s.push('\n');

        s.push_str("## Savings opportunities\n\n");
        if self.opportunities.is_empty() {
            s.push_str("- (none)\n\n");
        } else {
            for o in &self.opportunities {
                s.push_str(&format!("### {}\n", o.title));
                s.push_str(&format!("- type: `{}`\n", o.kind.as_str()));
                s.push_str(&format!("- priority: `{:?}`\n", o.priority));
                s.push_str(&format!("- confidence: `{}`\n", o.confidence));
                s.push_str(&format!(
                    "- potential_savings: `{:.2}`\n",
                    o.potential_savings
                ));
                s.push_str(&format!("- description: {}\n", o.description));
                s.push_str(&format!("- action_required: {}\n", o.action_required));
                s.push('\n');
            }
        }

        s.push_str("## Forecast\n\n");
        for f in &self.forecast {
            s.push_str(&format!(
                "- {}: `{:.2}` (confidence {:.0})\n",
                f.period, f.predicted_cost, f.confidence
            ));
        }
        if let Some(first) = self.forecast.first() {
            for factor in &first.factors {
                s.push_str(&format!("  - factor: {}\n", factor));
            }
            for rec in &first.recommendations {
                s.push_str(&format!("  - recommendation: {}\n", rec));
            }
        }
        s.push('\n');

        if let Some(cmp) = &self.baseline_comparison {
            s.push_str("## Baseline comparison\n\n");
            s.push_str(&format!(
                "- baseline_monthly_cost: `{:.2}`\n",
                cmp.baseline_monthly_cost
            ));
            s.push_str(&format!(
                "- delta_monthly_cost: `{:.2}`\n",
                cmp.delta_monthly_cost
            ));
            s.push_str(&format!(
                "- regression_ratio: `{:.3}`\n",
                cmp.regression_ratio
            ));
            s.push('\n');
        }

        if let Some(b) = &self.budget {
            s.push_str("## Budget gate\n\n");
            s.push_str(&format!(
                "- threshold_regression_ratio: `{:.3}`\n",
                b.threshold_regression_ratio
            ));
            s.push_str(&format!("- pass: `{}`\n", b.pass));
            s.push_str(&format!("- reason: `{}`\n", b.reason));
            s.push('\n');
        }

        s
    }
}

pub fn compare_to_baseline(b: &Baseline, summary: &Summary) -> BaselineComparison {
    let baseline = b.baseline_monthly_cost;
    let current = summary.latest_monthly_cost;
    let regression_ratio = if baseline == 0.0 {
        if current == 0.0 {
            1.0
        } else {
            f64::INFINITY
        }
    } else {
        current / baseline
    };

    BaselineComparison {
        baseline_monthly_cost: baseline,
        regression_ratio,
        delta_monthly_cost: current - baseline,
    }
}

pub fn evaluate_budget(threshold: f64, cmp: &BaselineComparison) -> BudgetResult {
    let pass = cmp.regression_ratio <= threshold;
    BudgetResult {
        threshold_regression_ratio: threshold,
        pass,
        reason: if pass {
            "within spend regression budget".to_string()
        } else {
            format!(
                "regression_ratio {:.3} exceeds threshold {:.3}",
                cmp.regression_ratio, threshold
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OpportunityType, Priority};

    fn report() -> AnalysisReport {
        AnalysisReport::new(
            Inputs {
                organization_id: "org-acme".to_string(),
                as_of: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
                input_path: "x".to_string(),
                parse_mode: "STRICT".to_string(),
                sources: vec!["usage.jsonl".to_string()],
            },
            vec![CostTrend {
                month: "2026-10".to_string(),
                total_cost: 500.0,
                growth_rate: 0.0,
            }],
            vec![LicenseUtilization {
                license_id: "lic".to_string(),
                application_id: "app".to_string(),
                application_name: "Slack".to_string(),
                total_licenses: 100,
                used_licenses: 5,
                utilization_rate: 5.0,
                inactive_users: 95,
            }],
            vec![SavingsOpportunity {
                kind: OpportunityType::UnusedLicense,
                title: "Unused Slack licenses".to_string(),
                description: "d".to_string(),
                application_ids: vec!["app".to_string()],
                potential_savings: 11_400.0,
                priority: Priority::High,
                confidence: 85,
                action_required: "a".to_string(),
            }],
            vec![CostForecast::insufficient_data()],
        )
    }

    #[test]
    fn summary_is_derived_from_sections() {
        let r = report();
        assert_eq!(r.summary.latest_monthly_cost, 500.0);
        assert_eq!(r.summary.average_utilization, 5.0);
        assert_eq!(r.summary.total_potential_savings, 11_400.0);
        assert_eq!(r.summary.opportunity_count, 1);
    }

    #[test]
    fn markdown_includes_sections_and_opportunities() {
        let mut r = report();
        let cmp = compare_to_baseline(
            &Baseline {
                baseline_monthly_cost: 250.0,
            },
            &r.summary,
        );
        r.budget = Some(evaluate_budget(1.5, &cmp));
        r.baseline_comparison = Some(cmp);

        let md = r.to_markdown();
        assert!(md.contains("## Summary"));
        assert!(md.contains("## Cost trends"));
        assert!(md.contains("| Slack | 100 | 5 | 95 | 5.0% |"));
        assert!(md.contains("### Unused Slack licenses"));
        assert!(md.contains("- insufficient-data: `0.00`"));
        assert!(md.contains("## Baseline comparison"));
        assert!(md.contains("## Budget gate"));
    }

    #[test]
    fn baseline_comparison_infinite_when_baseline_zero() {
        let b = Baseline {
            baseline_monthly_cost: 0.0,
        };
        let cmp = compare_to_baseline(&b, &report().summary);
        assert!(cmp.regression_ratio.is_infinite());
        assert!(!evaluate_budget(10.0, &cmp).pass);
    }

    #[test]
    fn budget_passes_at_threshold() {
        let b = Baseline {
            baseline_monthly_cost: 400.0,
        };
        let cmp = compare_to_baseline(&b, &report().summary);
        assert_eq!(cmp.regression_ratio, 1.25);
        assert_eq!(cmp.delta_monthly_cost, 100.0);
        assert!(evaluate_budget(1.25, &cmp).pass);
    }
}
