//! Validated configuration structures

use crate::schema::{RawConfig, RawDaemonConfig, RawRule};
use clocklock_store::Rule;
use clocklock_util::{
    DEFAULT_BOOTSTRAP_DOMAIN, Domain, data_dir_without_env, socket_path_without_env,
};
use std::path::PathBuf;
use std::time::Duration;

/// Default per-client request budget
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 30;

/// Validated configuration ready for use by the daemon
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub daemon: DaemonConfig,

    /// Seed rules, applied only to domains without a stored rule
    pub rules: Vec<Rule>,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonConfig::from_raw(raw.daemon),
            rules: raw.rules.into_iter().map(convert_rule).collect(),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub bootstrap_domain: Domain,
    pub requests_per_second: u32,
}

impl DaemonConfig {
    fn from_raw(raw: RawDaemonConfig) -> Self {
        let defaults = Self::default();
        Self {
            socket_path: raw.socket_path.unwrap_or(defaults.socket_path),
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            bootstrap_domain: raw
                .bootstrap_domain
                .map(Domain::new)
                .unwrap_or(defaults.bootstrap_domain),
            requests_per_second: raw
                .requests_per_second
                .unwrap_or(defaults.requests_per_second),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: socket_path_without_env(),
            data_dir: data_dir_without_env(),
            bootstrap_domain: Domain::new(DEFAULT_BOOTSTRAP_DOMAIN),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

fn convert_rule(raw: RawRule) -> Rule {
    Rule::new(
        raw.domain,
        Duration::from_secs(raw.time_limit_seconds),
        Duration::from_secs(raw.cooldown_seconds),
    )
    .with_track_in_background(raw.track_in_background)
}
