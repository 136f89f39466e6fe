use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const CONFIG_FILE_NAME: &str = "seatspend.toml";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub organization_id: Option<String>,
    pub trend_months: Option<u32>,
    pub forecast_months: Option<u32>,
    pub budget_ratio: Option<f64>,
    pub strict: Option<bool>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let config: Config =
            toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
        Ok(config)
    }

    /// Looks for `seatspend.toml` in the working directory.
    pub fn discover() -> Option<Self> {
        Self::discover_in(Path::new("."))
    }

    /// Loads `seatspend.toml` from `dir` if present. A file that fails to
    /// load is logged and skipped.
    pub fn discover_in(dir: &Path) -> Option<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return None;
        }
        match Config::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "ignoring config");
                None
            }
        }
    }
}
