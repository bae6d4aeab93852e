//! Core events emitted by the engine

use chrono::{DateTime, Utc};
use clocklock_api::EventPayload;
use clocklock_util::{Domain, duration_as_millis, duration_until};

/// Events emitted by the tracking engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Budget exhausted; the domain is blocked until `until`
    DomainBlocked { domain: Domain, until: DateTime<Utc> },

    /// A stale block marker was cleared and `time_spent` zeroed
    DomainReset { domain: Domain },

    /// Rules were loaded, added, replaced, or removed
    RulesChanged { rule_count: usize },
}

impl CoreEvent {
    /// Wire form of the event as seen at `now`
    pub fn to_payload(&self, now: DateTime<Utc>) -> EventPayload {
        match self {
            CoreEvent::DomainBlocked { domain, until } => EventPayload::DomainBlocked {
                domain: domain.clone(),
                cooldown_remaining_ms: duration_as_millis(duration_until(now, *until)),
            },
            CoreEvent::DomainReset { domain } => EventPayload::DomainReset {
                domain: domain.clone(),
            },
            CoreEvent::RulesChanged { rule_count } => EventPayload::RulesChanged {
                rule_count: *rule_count,
            },
        }
    }
}
