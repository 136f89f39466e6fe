use std::{
    collections::{BTreeSet, HashMap},
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::Context;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::types::{Application, License, UsageRecord};

use super::{
    parse_usage_jsonl, parse_usage_log, ApplicationLicenses, DataSource, DateRange, LicenseUsage,
    ParseMode, PricedUsage,
};

/// Everything the analysis reads, held in memory.
///
/// On disk a snapshot is a directory with `applications.json`, `licenses.json`
/// and any number of `*.jsonl` / `*.log` usage exports below it.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub applications: Vec<Application>,
    pub licenses: Vec<License>,
    pub usage: Vec<UsageRecord>,
    pub sources: Vec<String>,
}

impl Snapshot {
    pub fn new(
        applications: Vec<Application>,
        licenses: Vec<License>,
        usage: Vec<UsageRecord>,
    ) -> Self {
        Self {
            applications,
            licenses,
            usage,
            sources: vec![],
        }
    }

    pub fn load_dir(
        input: &Path,
        mode: ParseMode,
        max_total_bytes_scanned: u64,
    ) -> anyhow::Result<Self> {
        let applications: Vec<Application> = read_json(&input.join("applications.json"))?;
        let licenses: Vec<License> = read_json(&input.join("licenses.json"))?;
        let licenses = validate_licenses(licenses, &applications, mode)?;

        let mut usage: Vec<UsageRecord> = Vec::new();
        let mut sources: Vec<String> = Vec::new();
        let mut scanned: u64 = 0;

        for entry in WalkDir::new(input).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            if !(ext == "jsonl" || ext == "log") {
                continue;
            }

            let len = std::fs::metadata(path)
                .with_context(|| format!("stat {}", path.display()))?
                .len();
            if scanned.saturating_add(len) > max_total_bytes_scanned {
                warn!(
                    path = %path.display(),
                    max_total_bytes_scanned,
                    "scan budget exhausted, remaining usage files ignored"
                );
                break;
            }
            scanned += len;

            let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut reader = BufReader::new(f);
            let result = if ext == "jsonl" {
                parse_usage_jsonl(&mut reader, mode)
            } else {
                parse_usage_log(&mut reader, mode)
            };
            let parsed = result.with_context(|| format!("parse usage {}", path.display()))?;

            debug!(
                path = %path.display(),
                records = parsed.records.len(),
                skipped = parsed.skipped,
                "loaded usage file"
            );
            usage.extend(parsed.records);
            sources.push(path.display().to_string());
        }

        Ok(Self {
            applications,
            licenses,
            usage,
            sources,
        })
    }

    /// Organizations that own at least one application.
    pub fn organizations(&self) -> BTreeSet<&str> {
        self.applications
            .iter()
            .map(|a| a.organization_id.as_str())
            .collect()
    }

    fn applications_of<'a>(&'a self, organization_id: &str) -> HashMap<&'a str, &'a Application> {
        self.applications
            .iter()
            .filter(|a| a.organization_id == organization_id)
            .map(|a| (a.id.as_str(), a))
            .collect()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

fn validate_licenses(
    licenses: Vec<License>,
    applications: &[Application],
    mode: ParseMode,
) -> anyhow::Result<Vec<License>> {
    let owners: HashMap<&str, &str> = applications
        .iter()
        .map(|a| (a.id.as_str(), a.organization_id.as_str()))
        .collect();
    let mut kept = Vec::with_capacity(licenses.len());

    for license in licenses {
        let owner = owners.get(license.application_id.as_str()).copied();
        let problem = if owner.is_none() {
            Some(format!("unknown application {}", license.application_id))
        } else if owner != Some(license.organization_id.as_str()) {
            Some(format!(
                "organization {} does not own application {}",
                license.organization_id, license.application_id
            ))
        } else if !license.cost_per_seat.is_finite() || license.cost_per_seat < 0.0 {
            Some(format!("invalid cost_per_seat {}", license.cost_per_seat))
        } else {
            None
        };

        match problem {
            Some(reason) if mode == ParseMode::Strict => {
                anyhow::bail!("license {}: {reason}", license.id)
            }
            Some(reason) => warn!(license = %license.id, %reason, "dropping license"),
            None => kept.push(license),
        }
    }

    Ok(kept)
}

impl DataSource for Snapshot {
    fn list_usage_records(
        &self,
        organization_id: &str,
        range: DateRange,
    ) -> anyhow::Result<Vec<PricedUsage>> {
        let apps = self.applications_of(organization_id);
        let cost_per_seat: HashMap<&str, f64> = self
            .licenses
            .iter()
            .filter(|l| l.organization_id == organization_id)
            .map(|l| (l.id.as_str(), l.cost_per_seat))
            .collect();

        Ok(self
            .usage
            .iter()
            .filter(|r| apps.contains_key(r.application_id.as_str()) && range.contains(r.date))
            .map(|r| PricedUsage {
                record: r.clone(),
                cost_per_seat: r
                    .license_id
                    .as_deref()
                    .and_then(|id| cost_per_seat.get(id).copied()),
            })
            .collect())
    }

    fn list_active_licenses(&self, organization_id: &str) -> anyhow::Result<Vec<LicenseUsage>> {
        let apps = self.applications_of(organization_id);

        Ok(self
            .licenses
            .iter()
            .filter(|l| l.active && l.organization_id == organization_id)
            .filter_map(|l| {
                let app = apps.get(l.application_id.as_str())?;
                Some(LicenseUsage {
                    license: l.clone(),
                    application: (*app).clone(),
                    usage: self
                        .usage
                        .iter()
                        .filter(|r| {
                            r.application_id == l.application_id
                                && r.license_id.as_deref() == Some(l.id.as_str())
                        })
                        .cloned()
                        .collect(),
                })
            })
            .collect())
    }

    fn list_applications(
        &self,
        organization_id: &str,
    ) -> anyhow::Result<Vec<ApplicationLicenses>> {
        Ok(self
            .applications
            .iter()
            .filter(|a| a.organization_id == organization_id)
            .map(|a| ApplicationLicenses {
                application: a.clone(),
                licenses: self
                    .licenses
                    .iter()
                    .filter(|l| l.active && l.application_id == a.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }
}
