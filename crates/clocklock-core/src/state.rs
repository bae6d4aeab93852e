//! Derived per-domain views

use chrono::{DateTime, Utc};
use clocklock_store::Rule;
use clocklock_util::Domain;
use std::time::Duration;

use crate::CoreEvent;

/// Where a domain sits in the block lifecycle.
///
/// Never stored; recomputed from the site state, the rule, and `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No block marker; ticks accumulate
    Tracking,
    /// Cooldown running; ticks are discarded
    Blocked { until: DateTime<Utc> },
    /// A block marker remains but the cooldown is over (or no longer
    /// applies); the next tick or sync resets the domain
    Expired,
}

impl Phase {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Phase::Blocked { .. })
    }
}

/// Result of reporting a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOutcome {
    /// Block decision after this tick was applied
    pub blocked: bool,
    /// Transition caused by this tick, if any
    pub event: Option<CoreEvent>,
}

impl TrackOutcome {
    pub(crate) fn allowed() -> Self {
        Self {
            blocked: false,
            event: None,
        }
    }

    pub(crate) fn still_blocked() -> Self {
        Self {
            blocked: true,
            event: None,
        }
    }
}

/// Read-only summary of one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainStatus {
    pub domain: Domain,
    pub rule: Option<Rule>,
    pub phase: Phase,
    pub time_spent: Duration,
    pub cooldown_remaining: Duration,
    /// `None` means unbounded (no rule)
    pub time_left: Option<Duration>,
}

impl DomainStatus {
    pub fn is_blocked(&self) -> bool {
        self.phase.is_blocked()
    }
}
