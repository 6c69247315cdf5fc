//! User-level configuration for repocensus
//!
//! Supports loading config from:
//! - Environment variables
//! - ~/.config/repocensus/config.toml

use crate::collector::CollectOptions;
use crate::reporters::OutputFormat;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct CollectConfig {
    /// Blame worker threads (default: available parallelism)
    pub workers: Option<usize>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Cache root (default: ~/.cache/repocensus)
    pub dir: Option<PathBuf>,

    /// Read and write cached datasets (default: true)
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Preferred report format: "html" or "json"
    pub format: Option<String>,
}

impl UserConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. User config (~/.config/repocensus/config.toml)
    ///
    /// A missing or unparsable file leaves the defaults in place.
    pub fn load() -> Result<Self> {
        let mut config = UserConfig::default();

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            match std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|content| Ok(toml::from_str::<UserConfig>(&content)?))
            {
                Ok(user_config) => config.merge(user_config),
                Err(e) => warn!("Ignoring config at {}: {}", path.display(), e),
            }
        }

        config.apply_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("repocensus").join("config.toml"))
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: UserConfig) {
        if other.collect.workers.is_some() {
            self.collect.workers = other.collect.workers;
        }
        if other.cache.dir.is_some() {
            self.cache.dir = other.cache.dir;
        }
        if other.cache.enabled.is_some() {
            self.cache.enabled = other.cache.enabled;
        }
        if other.report.format.is_some() {
            self.report.format = other.report.format;
        }
    }

    /// Apply `REPOCENSUS_*` overrides read through `var`.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("REPOCENSUS_CACHE_DIR").filter(|v| !v.is_empty()) {
            self.cache.dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = var("REPOCENSUS_WORKERS").filter(|v| !v.is_empty()) {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => self.collect.workers = Some(n),
                _ => warn!("Ignoring invalid REPOCENSUS_WORKERS={}", raw),
            }
        }
        if var("REPOCENSUS_NO_CACHE").is_some_and(|v| !v.is_empty()) {
            self.cache.enabled = Some(false);
        }
    }

    /// Whether cached datasets are used
    pub fn cache_enabled(&self) -> bool {
        self.cache.enabled.unwrap_or(true)
    }

    /// Report format from `[report] format`, falling back to HTML when
    /// it is unset or not a known format.
    pub fn report_format(&self) -> OutputFormat {
        let Some(raw) = self.report.format.as_deref() else {
            return OutputFormat::Html;
        };
        raw.parse().unwrap_or_else(|e| {
            warn!("Ignoring [report] format: {}", e);
            OutputFormat::Html
        })
    }

    /// Resolve into library collection options.
    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            workers: self.collect.workers.filter(|&n| n > 0),
            cache_dir: self.cache.dir.clone(),
            use_cache: self.cache_enabled(),
        }
    }

    /// Initialize user config directory and create example config
    pub fn init_user_config() -> Result<PathBuf> {
        let config_path = Self::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if !config_path.exists() {
            let example = r#"# repocensus user configuration

[collect]
# Blame worker threads (default: number of CPUs)
# workers = 8

[cache]
# Where collected datasets are cached (default: ~/.cache/repocensus)
# dir = "/tmp/repocensus-cache"
# enabled = true

[report]
# Preferred report format: "html" or "json"
# format = "html"
"#;
            std::fs::write(&config_path, example)?;
        }

        Ok(config_path)
    }
}
