use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Directory for daily rolling log files; stderr when unset.
    pub log_dir: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub prefer_speed: bool,
    pub stats_interval_secs: u64,
}

impl RunnerConfig {
    /// Reads the file, or writes one with the defaults if it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        } else {
            let default = Self::default();
            let content = toml::to_string_pretty(&default)?;
            fs::write(path, content)
                .with_context(|| format!("writing default config {}", path.display()))?;
            Ok(default)
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            log_dir: None,
            request_timeout_secs: 15,
            user_agent: concat!("talentscope/", env!("CARGO_PKG_VERSION")).to_string(),
            prefer_speed: true,
            stats_interval_secs: 10,  // seconds
        }
    }
}
