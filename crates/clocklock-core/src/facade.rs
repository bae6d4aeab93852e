//! Session facade: the one state holder behind the message boundary

use chrono::{DateTime, TimeDelta, Utc};
use clocklock_api::{
    ClientInfo, Command, ErrorCode, ErrorInfo, GetStatusRequest, HealthStatus, ResponsePayload,
    ResponseResult, RuleView, StatusResponse, TrackTimeRequest, TrackTimeResponse,
};
use clocklock_util::{Domain, duration_as_millis};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{CoreEvent, CoreResult, Rule, TrackingEngine};

/// Outcome of dispatching one command
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub result: ResponseResult,
    /// Events to broadcast to subscribers
    pub events: Vec<CoreEvent>,
}

impl Dispatch {
    fn ok(payload: ResponsePayload) -> Self {
        Self {
            result: ResponseResult::Ok(payload),
            events: Vec::new(),
        }
    }

    fn err(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            result: ResponseResult::Err(ErrorInfo::new(code, message)),
            events: Vec::new(),
        }
    }

    fn with_event(mut self, event: Option<CoreEvent>) -> Self {
        self.events.extend(event);
        self
    }
}

/// Wraps the engine for the daemon and converts between wire and core types.
///
/// Constructed once at startup and shared by handle; every call is expected
/// to be serialized by the owner.
pub struct SessionFacade {
    engine: TrackingEngine,
    rules_loaded: bool,
}

impl SessionFacade {
    /// Wrap an engine that has not been initialized yet
    pub fn new(engine: TrackingEngine) -> Self {
        Self {
            engine,
            rules_loaded: false,
        }
    }

    pub fn engine(&self) -> &TrackingEngine {
        &self.engine
    }

    pub fn rules_loaded(&self) -> bool {
        self.rules_loaded
    }

    /// Reload everything from the store.
    pub fn reload(&mut self) -> CoreResult<CoreEvent> {
        let event = self.engine.initialize()?;
        self.rules_loaded = true;
        Ok(event)
    }

    /// Handle a track-time message. Never fails; errors land in `error`.
    ///
    /// Negative deltas go to the engine like any other tick, so a blocked
    /// domain answers blocked regardless of what was reported.
    pub fn track_time(
        &mut self,
        req: &TrackTimeRequest,
        now: DateTime<Utc>,
    ) -> (TrackTimeResponse, Option<CoreEvent>) {
        if req.domain.is_empty() {
            warn!("track_time with empty domain");
            return (TrackTimeResponse::failed("domain must not be empty"), None);
        }

        // i64::MIN is the only value out of range
        let delta = TimeDelta::try_milliseconds(req.delta_ms).unwrap_or(TimeDelta::MIN);

        match self.engine.track_time(&req.domain, delta, now) {
            Ok(outcome) => {
                let cooldown_remaining_ms = outcome.blocked.then(|| {
                    duration_as_millis(self.engine.cooldown_remaining(&req.domain, now))
                });
                (
                    TrackTimeResponse {
                        blocked: outcome.blocked,
                        cooldown_remaining_ms,
                        error: None,
                    },
                    outcome.event,
                )
            }
            Err(e) => (TrackTimeResponse::failed(e.to_string()), None),
        }
    }

    /// Handle a get-status message
    pub fn get_status(&self, req: &GetStatusRequest, now: DateTime<Utc>) -> StatusResponse {
        let status = self.engine.status(&req.domain, now);
        let blocked = status.is_blocked();

        StatusResponse {
            blocked,
            cooldown_remaining_ms: blocked.then(|| duration_as_millis(status.cooldown_remaining)),
            track_in_background: status.rule.as_ref().map(|r| r.track_in_background),
            time_left_ms: status.time_left.map(duration_as_millis),
        }
    }

    pub fn sync(&mut self, domain: &Domain, now: DateTime<Utc>) -> CoreResult<Option<CoreEvent>> {
        let reset = self.engine.sync_state(domain, now)?;
        Ok(reset.then(|| CoreEvent::DomainReset {
            domain: domain.clone(),
        }))
    }

    /// Apply configured rules to domains the store has no say on yet.
    ///
    /// A domain counts as unset when it has no rule, or when it only carries
    /// the untouched bootstrap rule. Returns how many rules were written.
    pub fn seed_rules(&mut self, seeds: &[Rule]) -> CoreResult<usize> {
        let mut applied = 0;
        for seed in seeds {
            let unset = match self.engine.rule(&seed.domain) {
                None => true,
                Some(existing) => {
                    &existing.domain == self.engine.bootstrap_domain()
                        && existing.time_limit.is_zero()
                        && !existing.blocking_enabled()
                }
            };
            if !unset {
                debug!(domain = %seed.domain, "Stored rule wins over seed");
                continue;
            }

            self.engine.add_or_replace_rule(seed.clone())?;
            applied += 1;
        }

        if applied > 0 {
            info!(applied, "Seed rules applied");
        }
        Ok(applied)
    }

    pub fn set_rule(&mut self, rule: Rule) -> CoreResult<CoreEvent> {
        self.engine.add_or_replace_rule(rule)
    }

    pub fn remove_rule(&mut self, domain: &Domain) -> CoreResult<bool> {
        self.engine.remove_rule(domain)
    }

    pub fn rules(&self) -> Vec<RuleView> {
        self.engine.rules().iter().map(rule_view).collect()
    }

    pub fn rule(&self, domain: &Domain) -> Option<RuleView> {
        self.engine.rule(domain).map(rule_view)
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            live: true,
            ready: self.rules_loaded,
            rules_loaded: self.rules_loaded,
            store_ok: self.engine.store_healthy(),
        }
    }

    /// Dispatch a protocol command on behalf of `client`.
    pub fn handle(&mut self, client: &ClientInfo, command: Command, now: DateTime<Utc>) -> Dispatch {
        if command.edits_rules() && !client.role.can_edit_rules() {
            warn!(client_id = %client.client_id, role = ?client.role, "Rule edit denied");
            return Dispatch::err(ErrorCode::PermissionDenied, "Admin role required");
        }

        match command {
            Command::TrackTime(req) => {
                let (response, event) = self.track_time(&req, now);
                Dispatch::ok(ResponsePayload::TrackTime(response)).with_event(event)
            }

            Command::GetStatus(req) => {
                Dispatch::ok(ResponsePayload::Status(self.get_status(&req, now)))
            }

            Command::SyncState { domain } => match self.sync(&domain, now) {
                Ok(event) => Dispatch::ok(ResponsePayload::Synced {
                    reset: event.is_some(),
                })
                .with_event(event),
                Err(e) => Dispatch::err(ErrorCode::PersistenceError, e.to_string()),
            },

            Command::ListRules => Dispatch::ok(ResponsePayload::Rules {
                rules: self.rules(),
            }),

            Command::GetRule { domain } => Dispatch::ok(ResponsePayload::Rule {
                rule: self.rule(&domain),
            }),

            Command::SetRule { rule } => {
                if rule.domain.is_empty() {
                    return Dispatch::err(ErrorCode::InvalidRequest, "domain must not be empty");
                }
                match self.set_rule(rule_from_view(rule)) {
                    Ok(event) => Dispatch::ok(ResponsePayload::RuleSaved).with_event(Some(event)),
                    Err(e) => Dispatch::err(ErrorCode::PersistenceError, e.to_string()),
                }
            }

            Command::RemoveRule { domain } => match self.remove_rule(&domain) {
                Ok(removed) => {
                    let event = CoreEvent::RulesChanged {
                        rule_count: self.engine.rules().len(),
                    };
                    Dispatch::ok(ResponsePayload::RuleRemoved { removed }).with_event(Some(event))
                }
                Err(e) => Dispatch::err(ErrorCode::PersistenceError, e.to_string()),
            },

            Command::ReloadRules => match self.reload() {
                Ok(event) => {
                    info!(client_id = %client.client_id, "Rules reloaded on request");
                    Dispatch::ok(ResponsePayload::RulesReloaded {
                        rule_count: self.engine.rules().len(),
                    })
                    .with_event(Some(event))
                }
                Err(e) => Dispatch::err(ErrorCode::PersistenceError, e.to_string()),
            },

            Command::SubscribeEvents => {
                debug!(client_id = %client.client_id, "Client subscribed");
                Dispatch::ok(ResponsePayload::Subscribed {
                    client_id: client.client_id.clone(),
                })
            }

            Command::UnsubscribeEvents => Dispatch::ok(ResponsePayload::Unsubscribed),

            Command::GetHealth => Dispatch::ok(ResponsePayload::Health(self.health())),

            Command::Ping => Dispatch::ok(ResponsePayload::Pong),
        }
    }
}

/// Wire form of a rule
pub fn rule_view(rule: &Rule) -> RuleView {
    RuleView {
        domain: rule.domain.clone(),
        time_limit_ms: duration_as_millis(rule.time_limit),
        cooldown_ms: duration_as_millis(rule.cooldown),
        track_in_background: rule.track_in_background,
    }
}

pub fn rule_from_view(view: RuleView) -> Rule {
    Rule::new(
        view.domain,
        Duration::from_millis(view.time_limit_ms),
        Duration::from_millis(view.cooldown_ms),
    )
    .with_track_in_background(view.track_in_background)
}
