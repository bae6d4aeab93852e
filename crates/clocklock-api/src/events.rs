//! Event types for clocklockd -> client streaming
//!
//! Cooldown expiry is deliberately absent: the engine has no timer, so a
//! release only becomes visible when a client polls `get_status`.

use chrono::{DateTime, Utc};
use clocklock_util::Domain;
use serde::{Deserialize, Serialize};

use crate::API_VERSION;

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: clocklock_util::now(),
            payload,
        }
    }
}

/// All possible events from the daemon to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A domain exhausted its budget and entered cooldown
    DomainBlocked {
        domain: Domain,
        cooldown_remaining_ms: u64,
    },

    /// An expired cooldown was cleared and accounting restarted
    DomainReset { domain: Domain },

    /// The rule set was edited or reloaded
    RulesChanged { rule_count: usize },
}
