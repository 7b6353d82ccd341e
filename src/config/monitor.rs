// src/config/monitor.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::config::{default_collectors, CollectorConfig};

pub const ENV_MONITOR_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const DEFAULT_MONITOR_CONFIG_PATH: &str = "config/monitor.toml";

fn default_topic() -> String {
    "Venezuela".to_string()
}
fn default_cycle_interval_secs() -> u64 {
    300
}
fn default_report_hour_utc() -> u32 {
    23
}
fn default_item_concurrency() -> usize {
    4
}
fn default_severity_tiers_path() -> PathBuf {
    PathBuf::from("config/severity_tiers.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Monitored topic; used in default feeds and report summaries.
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
    #[serde(default = "default_report_hour_utc")]
    pub report_hour_utc: u32,
    /// Items classified/persisted in parallel within one cycle.
    #[serde(default = "default_item_concurrency")]
    pub item_concurrency: usize,
    #[serde(default = "default_severity_tiers_path")]
    pub severity_tiers_path: PathBuf,
    /// Empty means "use the built-in collectors for `topic`".
    #[serde(default)]
    pub collectors: Vec<CollectorConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            cycle_interval_secs: default_cycle_interval_secs(),
            report_hour_utc: default_report_hour_utc(),
            item_concurrency: default_item_concurrency(),
            severity_tiers_path: default_severity_tiers_path(),
            collectors: Vec::new(),
        }
    }
}

impl MonitorConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        let cfg: MonitorConfig = toml::from_str(&data)
            .with_context(|| format!("parsing monitor config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks:
    /// 1) $MONITOR_CONFIG_PATH (must exist)
    /// 2) config/monitor.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_MONITOR_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_MONITOR_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_MONITOR_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from_file(&default_path);
        }
        Ok(Self::default().sanitized())
    }

    /// Configured collectors, or the built-in ones for `topic`.
    pub fn effective_collectors(&self) -> Vec<CollectorConfig> {
        if self.collectors.is_empty() {
            default_collectors(&self.topic)
        } else {
            self.collectors.clone()
        }
    }

    fn sanitized(mut self) -> Self {
        if self.cycle_interval_secs == 0 {
            self.cycle_interval_secs = default_cycle_interval_secs();
        }
        if self.report_hour_utc > 23 {
            self.report_hour_utc = default_report_hour_utc();
        }
        self.item_concurrency = self.item_concurrency.max(1);
        self
    }
}
