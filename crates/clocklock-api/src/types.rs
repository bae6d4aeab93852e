//! Shared types for the clocklockd API

use clocklock_util::Domain;
use serde::{Deserialize, Serialize};

/// Wire form of a rule
///
/// Negative or fractional millisecond fields are accepted and read as if
/// truncated at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleView {
    pub domain: Domain,
    #[serde(deserialize_with = "clocklock_util::lenient_ms::deserialize")]
    pub time_limit_ms: u64,
    /// Zero disables blocking for the domain
    #[serde(deserialize_with = "clocklock_util::lenient_ms::deserialize")]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub track_in_background: bool,
}

/// One tick from a tracked browsing context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTimeRequest {
    pub domain: Domain,
    /// Signed; a negative tick takes time back, down to zero
    pub delta_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTimeResponse {
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_remaining_ms: Option<u64>,
    /// Set when tracking failed; `blocked` is then always false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrackTimeResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            blocked: false,
            cooldown_remaining_ms: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetStatusRequest {
    pub domain: Domain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_remaining_ms: Option<u64>,
    /// Absent when the domain has no rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_in_background: Option<bool>,
    /// Absent when the domain has no rule (unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left_ms: Option<u64>,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Tick source or status reader: track, query, sync
    Tracker,
    /// Local owner: can also edit and reload rules
    Admin,
}

impl ClientRole {
    pub fn can_edit_rules(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub rules_loaded: bool,
    pub store_ok: bool,
}
