//! Persisted data model
//!
//! Field names on disk are camelCase (`timeLimit`, `cooldownDuration`,
//! `siteStates`, ...) and durations are integer milliseconds, so state written
//! by one version of the daemon reads back unchanged in the next.

use chrono::{DateTime, Utc};
use clocklock_util::{Domain, duration_ms};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Time budget and cooldown for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub domain: Domain,

    /// Active time allowed before the domain is blocked
    #[serde(with = "duration_ms")]
    pub time_limit: Duration,

    /// How long a block lasts. Zero disables blocking for the domain.
    #[serde(rename = "cooldownDuration", with = "duration_ms")]
    pub cooldown: Duration,

    /// Count ticks from contexts that are not frontmost
    #[serde(default)]
    pub track_in_background: bool,
}

impl Rule {
    pub fn new(domain: impl Into<Domain>, time_limit: Duration, cooldown: Duration) -> Self {
        Self {
            domain: domain.into(),
            time_limit,
            cooldown,
            track_in_background: false,
        }
    }

    pub fn with_track_in_background(mut self, track: bool) -> Self {
        self.track_in_background = track;
        self
    }

    /// Whether reaching the limit can block at all
    pub fn blocking_enabled(&self) -> bool {
        !self.cooldown.is_zero()
    }
}

/// Runtime counters for one domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteState {
    /// Active time accrued since the last reset
    #[serde(with = "duration_ms")]
    pub time_spent: Duration,

    /// When the current block began; `None` outside a block lifecycle
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_blocked: Option<DateTime<Utc>>,
}

impl SiteState {
    /// Clear the block marker and start a fresh accounting window
    pub fn reset(&mut self) {
        self.last_blocked = None;
        self.time_spent = Duration::ZERO;
    }
}

pub type SiteStates = BTreeMap<Domain, SiteState>;

/// Everything the store round-trips
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub site_states: SiteStates,
}
