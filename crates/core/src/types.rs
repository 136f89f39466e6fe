use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum AppCategory {
    Communication,
    Productivity,
    ProjectManagement,
    Design,
    Development,
    Security,
    Analytics,
    Storage,
    Other,
}

impl AppCategory {
    /// Whether several apps in this category can be treated as overlapping tools.
    pub fn is_consolidation_candidate(self) -> bool {
        match self {
            AppCategory::Communication
            | AppCategory::Productivity
            | AppCategory::ProjectManagement
            | AppCategory::Design
            | AppCategory::Development
            | AppCategory::Security
            | AppCategory::Analytics
            | AppCategory::Storage => true,
            AppCategory::Other => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppCategory::Communication => "communication",
            AppCategory::Productivity => "productivity",
            AppCategory::ProjectManagement => "project-management",
            AppCategory::Design => "design",
            AppCategory::Development => "development",
            AppCategory::Security => "security",
            AppCategory::Analytics => "analytics",
            AppCategory::Storage => "storage",
            AppCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn annualization_factor(self) -> f64 {
        match self {
            BillingCycle::Monthly => 12.0,
            BillingCycle::Yearly => 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    pub category: AppCategory,
    pub organization_id: String,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    pub application_id: String,
    pub total_seats: u32,
    pub cost_per_seat: f64,
    pub billing_cycle: BillingCycle,
    pub organization_id: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl License {
    /// Full seat cost over one year.
    pub fn annual_cost(&self) -> f64 {
        self.total_seats as f64 * self.cost_per_seat * self.billing_cycle.annualization_factor()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub application_id: String,
    #[serde(default)]
    pub license_id: Option<String>,
    pub date: NaiveDate,
    pub active_users: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostTrend {
    /// `YYYY-MM`
    pub month: String,
    pub total_cost: f64,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LicenseUtilization {
    pub license_id: String,
    pub application_id: String,
    pub application_name: String,
    pub total_licenses: u32,
    pub used_licenses: u32,
    pub utilization_rate: f64,
    pub inactive_users: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    UnusedLicense,
    UnderutilizedApp,
    DuplicateFunctionality,
}

impl OpportunityType {
    pub fn as_str(self) -> &'static str {
        match self {
            OpportunityType::UnusedLicense => "unused_license",
            OpportunityType::UnderutilizedApp => "underutilized_app",
            OpportunityType::DuplicateFunctionality => "duplicate_functionality",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingsOpportunity {
    #[serde(rename = "type")]
    pub kind: OpportunityType,
    pub title: String,
    pub description: String,
    pub application_ids: Vec<String>,
    /// Annualized.
    pub potential_savings: f64,
    pub priority: Priority,
    pub confidence: u8,
    pub action_required: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostForecast {
    pub period: String,
    pub predicted_cost: f64,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Response wrapper handed to transport layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
