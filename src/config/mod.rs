//! Configuration module for repocensus
//!
//! Settings come from, in increasing priority:
//! - ~/.config/repocensus/config.toml
//! - `REPOCENSUS_*` environment variables
//! - command-line flags (applied by the CLI)

mod user_config;

pub use user_config::{CacheConfig, CollectConfig, ReportConfig, UserConfig};
