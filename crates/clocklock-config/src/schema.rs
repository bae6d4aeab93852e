//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global daemon settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// Rules seeded into the store on first start
    #[serde(default)]
    pub rules: Vec<RawRule>,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/clocklock/clocklockd.sock)
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Domain that always gets an inert default rule
    pub bootstrap_domain: Option<String>,

    /// Per-client request budget
    pub requests_per_second: Option<u32>,
}

/// Raw seed rule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRule {
    pub domain: String,

    /// Allowed active time before blocking
    pub time_limit_seconds: u64,

    /// Lockout after the limit is hit; 0 disables blocking
    pub cooldown_seconds: u64,

    #[serde(default)]
    pub track_in_background: bool,
}
