//! Command types for the clocklockd protocol

use clocklock_util::{ClientId, Domain};
use serde::{Deserialize, Serialize};

use crate::{
    ClientRole, GetStatusRequest, HealthStatus, RuleView, StatusResponse, TrackTimeRequest,
    TrackTimeResponse, API_VERSION,
};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn new(request_id: u64, result: ResponseResult) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result,
        }
    }

    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self::new(request_id, ResponseResult::Ok(payload))
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self::new(request_id, ResponseResult::Err(error))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    UnsupportedVersion,
    PermissionDenied,
    RateLimited,
    PersistenceError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Report elapsed active time for a domain
    TrackTime(TrackTimeRequest),

    /// Ask whether a domain is blocked (used while blocked to detect release)
    GetStatus(GetStatusRequest),

    /// Apply a pending cooldown reset without tracking time
    SyncState { domain: Domain },

    ListRules,

    GetRule { domain: Domain },

    // Admin commands

    /// Add or replace the rule for `rule.domain`
    SetRule { rule: RuleView },

    RemoveRule { domain: Domain },

    /// Reload rules and site states from the store
    ReloadRules,

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

impl Command {
    /// Whether the command changes the rule set
    pub fn edits_rules(&self) -> bool {
        matches!(
            self,
            Command::SetRule { .. } | Command::RemoveRule { .. } | Command::ReloadRules
        )
    }
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    TrackTime(TrackTimeResponse),
    Status(StatusResponse),
    Synced { reset: bool },
    Rules { rules: Vec<RuleView> },
    Rule { rule: Option<RuleView> },
    RuleSaved,
    RuleRemoved { removed: bool },
    RulesReloaded { rule_count: usize },
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(role: ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}
