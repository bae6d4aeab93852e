//! Core time-tracking engine

use chrono::{DateTime, TimeDelta, Utc};
use clocklock_store::{AppState, Rule, SiteState, Store};
use clocklock_util::{
    DEFAULT_BOOTSTRAP_DOMAIN, Domain, capped_add, duration_as_millis, duration_until,
    saturating_add,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{CoreEvent, CoreResult, DomainStatus, Phase, TrackOutcome};

/// The core tracking engine.
///
/// Owns the only in-memory copy of the rules and site states. Callers must
/// serialize access; `track_time` reads then writes a site state without
/// any isolation of its own.
pub struct TrackingEngine {
    store: Arc<dyn Store>,
    state: AppState,
    bootstrap_domain: Domain,
}

impl TrackingEngine {
    /// Create an engine with empty in-memory state. Call `initialize` to load.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_bootstrap_domain(store, DEFAULT_BOOTSTRAP_DOMAIN)
    }

    pub fn with_bootstrap_domain(store: Arc<dyn Store>, bootstrap_domain: impl Into<Domain>) -> Self {
        Self {
            store,
            state: AppState::default(),
            bootstrap_domain: bootstrap_domain.into(),
        }
    }

    /// Replace in-memory state with what the store holds.
    ///
    /// On load failure the previous state is kept as is.
    pub fn initialize(&mut self) -> CoreResult<CoreEvent> {
        let loaded = self.store.load().inspect_err(|e| {
            warn!(error = %e, "Failed to load tracking state");
        })?;
        self.state = loaded;

        if self.rule(&self.bootstrap_domain).is_none() {
            let rule = Rule::new(self.bootstrap_domain.clone(), Duration::ZERO, Duration::ZERO);
            debug!(domain = %rule.domain, "Adding bootstrap rule");
            self.add_or_replace_rule(rule)?;
        }

        let rule_count = self.state.rules.len();
        info!(
            rule_count,
            site_count = self.state.site_states.len(),
            "Tracking state loaded"
        );

        Ok(CoreEvent::RulesChanged { rule_count })
    }

    /// All rules in insertion order
    pub fn rules(&self) -> &[Rule] {
        &self.state.rules
    }

    pub fn rule(&self, domain: &Domain) -> Option<&Rule> {
        self.state.rules.iter().find(|r| &r.domain == domain)
    }

    pub fn site_state(&self, domain: &Domain) -> Option<&SiteState> {
        self.state.site_states.get(domain)
    }

    pub fn bootstrap_domain(&self) -> &Domain {
        &self.bootstrap_domain
    }

    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    /// Add a rule, replacing any rule for the same domain, and persist all rules.
    ///
    /// The replacement moves to the end of the list.
    pub fn add_or_replace_rule(&mut self, rule: Rule) -> CoreResult<CoreEvent> {
        self.state.rules.retain(|r| r.domain != rule.domain);

        info!(
            domain = %rule.domain,
            time_limit_ms = duration_as_millis(rule.time_limit),
            cooldown_ms = duration_as_millis(rule.cooldown),
            track_in_background = rule.track_in_background,
            "Rule saved"
        );

        self.state.rules.push(rule);
        self.save_rules()?;

        Ok(CoreEvent::RulesChanged {
            rule_count: self.state.rules.len(),
        })
    }

    /// Remove the rule for `domain` and persist. Returns whether one existed.
    ///
    /// The site state is kept: re-adding the rule resumes from the
    /// accumulated `time_spent`.
    pub fn remove_rule(&mut self, domain: &Domain) -> CoreResult<bool> {
        let before = self.state.rules.len();
        self.state.rules.retain(|r| &r.domain != domain);
        let removed = self.state.rules.len() != before;

        if removed {
            info!(domain = %domain, "Rule removed");
        }

        self.save_rules()?;
        Ok(removed)
    }

    /// Account `delta` of active time to `domain`.
    ///
    /// Ticks for domains without a rule are ignored entirely. Ticks arriving
    /// while blocked are discarded, not queued, whatever their sign. The
    /// first tick after a cooldown has run out starts a fresh window before
    /// adding `delta`. A negative delta takes time back, down to zero.
    pub fn track_time(
        &mut self,
        domain: &Domain,
        delta: TimeDelta,
        now: DateTime<Utc>,
    ) -> CoreResult<TrackOutcome> {
        let Some(rule) = self.rule(domain).cloned() else {
            debug!(domain = %domain, "No rule for domain, tick ignored");
            return Ok(TrackOutcome::allowed());
        };

        if self.is_blocked(domain, now) {
            debug!(domain = %domain, "Domain blocked, tick discarded");
            return Ok(TrackOutcome::still_blocked());
        }

        let site = self.state.site_states.entry(domain.clone()).or_default();
        let mut event = None;

        if site.last_blocked.is_some() {
            site.reset();
            info!(domain = %domain, "Cooldown over, accounting reset");
            event = Some(CoreEvent::DomainReset {
                domain: domain.clone(),
            });
        }

        site.time_spent = match delta.to_std() {
            Ok(added) => capped_add(site.time_spent, added),
            Err(_) => site
                .time_spent
                .saturating_sub(delta.abs().to_std().unwrap_or(Duration::MAX)),
        };

        debug!(
            domain = %domain,
            delta_ms = delta.num_milliseconds(),
            time_spent_ms = duration_as_millis(site.time_spent),
            "Tracked time"
        );

        let mut blocked = false;
        if site.time_spent >= rule.time_limit && rule.blocking_enabled() {
            site.last_blocked = Some(now);
            blocked = true;

            let until = saturating_add(now, rule.cooldown);
            info!(
                domain = %domain,
                time_spent_ms = duration_as_millis(site.time_spent),
                until = %until,
                "Time limit reached, domain blocked"
            );
            event = Some(CoreEvent::DomainBlocked {
                domain: domain.clone(),
                until,
            });
        }

        self.save_site_states()?;

        Ok(TrackOutcome { blocked, event })
    }

    /// Whether `domain` is inside an active cooldown. Pure; never resets.
    pub fn is_blocked(&self, domain: &Domain, now: DateTime<Utc>) -> bool {
        self.block_deadline(domain).is_some_and(|until| now < until)
    }

    /// Time until the block on `domain` lifts, zero if not blocked.
    pub fn cooldown_remaining(&self, domain: &Domain, now: DateTime<Utc>) -> Duration {
        self.block_deadline(domain)
            .map(|until| duration_until(now, until))
            .unwrap_or(Duration::ZERO)
    }

    /// Budget left before blocking. `None` means unbounded (no rule).
    pub fn time_left(&self, domain: &Domain) -> Option<Duration> {
        let rule = self.rule(domain)?;
        let spent = self
            .site_state(domain)
            .map(|s| s.time_spent)
            .unwrap_or(Duration::ZERO);
        Some(rule.time_limit.saturating_sub(spent))
    }

    /// Apply a pending cooldown reset without tracking time.
    ///
    /// Returns whether a reset happened. Calling it again is a no-op.
    pub fn sync_state(&mut self, domain: &Domain, now: DateTime<Utc>) -> CoreResult<bool> {
        if self.rule(domain).is_none() || self.is_blocked(domain, now) {
            return Ok(false);
        }

        let Some(site) = self.state.site_states.get_mut(domain) else {
            return Ok(false);
        };
        if site.last_blocked.is_none() {
            return Ok(false);
        }

        site.reset();
        info!(domain = %domain, "Cooldown over, state synced");

        self.save_site_states()?;
        Ok(true)
    }

    /// Current lifecycle phase of `domain`
    pub fn phase(&self, domain: &Domain, now: DateTime<Utc>) -> Phase {
        let marked = self
            .site_state(domain)
            .is_some_and(|s| s.last_blocked.is_some());
        if !marked {
            return Phase::Tracking;
        }

        match self.block_deadline(domain) {
            Some(until) if now < until => Phase::Blocked { until },
            _ => Phase::Expired,
        }
    }

    pub fn status(&self, domain: &Domain, now: DateTime<Utc>) -> DomainStatus {
        DomainStatus {
            domain: domain.clone(),
            rule: self.rule(domain).cloned(),
            phase: self.phase(domain, now),
            time_spent: self
                .site_state(domain)
                .map(|s| s.time_spent)
                .unwrap_or(Duration::ZERO),
            cooldown_remaining: self.cooldown_remaining(domain, now),
            time_left: self.time_left(domain),
        }
    }

    /// End of the current block, if a block marker exists and the rule
    /// still enables blocking.
    fn block_deadline(&self, domain: &Domain) -> Option<DateTime<Utc>> {
        let started = self.site_state(domain)?.last_blocked?;
        let rule = self.rule(domain)?;
        if !rule.blocking_enabled() {
            return None;
        }
        Some(saturating_add(started, rule.cooldown))
    }

    fn save_rules(&self) -> CoreResult<()> {
        self.store.save_rules(&self.state.rules).inspect_err(|e| {
            warn!(error = %e, "Failed to save rules; in-memory state is ahead of the store");
        })?;
        Ok(())
    }

    fn save_site_states(&self) -> CoreResult<()> {
        self.store
            .save_site_states(&self.state.site_states)
            .inspect_err(|e| {
                warn!(error = %e, "Failed to save site states; in-memory state is ahead of the store");
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use chrono::TimeZone;
    use clocklock_store::{MemoryStore, SqliteStore};
    use clocklock_util::MAX_MILLIS_DURATION;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 26, 15, 0, 0).unwrap()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn tick(millis: i64) -> TimeDelta {
        TimeDelta::milliseconds(millis)
    }

    fn later(base: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
        base + TimeDelta::milliseconds(millis)
    }

    fn engine_with(store: Arc<MemoryStore>) -> TrackingEngine {
        let mut engine = TrackingEngine::new(store);
        engine.initialize().unwrap();
        engine
    }

    fn a_com() -> Domain {
        Domain::new("a.com")
    }

    fn engine_with_a_com(limit: u64, cooldown: u64) -> (TrackingEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut engine = engine_with(store.clone());
        engine
            .add_or_replace_rule(Rule::new("a.com", ms(limit), ms(cooldown)))
            .unwrap();
        (engine, store)
    }

    #[test]
    fn test_initialize_adds_inert_bootstrap_rule() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(store.clone());

        let rule = engine.rule(&Domain::new("youtube.com")).unwrap();
        assert_eq!(rule.time_limit, Duration::ZERO);
        assert_eq!(rule.cooldown, Duration::ZERO);
        assert_eq!(store.load().unwrap().rules.len(), 1);
    }

    #[test]
    fn test_initialize_keeps_existing_bootstrap_rule() {
        let existing = Rule::new("youtube.com", ms(60_000), ms(300_000));
        let store = Arc::new(MemoryStore::with_state(AppState {
            rules: vec![existing.clone()],
            site_states: Default::default(),
        }));
        let engine = engine_with(store.clone());

        assert_eq!(engine.rules(), &[existing]);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_initialize_custom_bootstrap_domain() {
        let store = Arc::new(MemoryStore::new());
        let mut engine = TrackingEngine::with_bootstrap_domain(store, "www.reddit.com");
        engine.initialize().unwrap();

        assert!(engine.rule(&Domain::new("reddit.com")).is_some());
        assert!(engine.rule(&Domain::new("youtube.com")).is_none());
    }

    #[test]
    fn test_initialize_failure_keeps_previous_state() {
        let (mut engine, store) = engine_with_a_com(1000, 5000);
        engine.track_time(&a_com(), tick(300), t0()).unwrap();

        store.set_fail_loads(true);
        let result = engine.initialize();

        assert!(matches!(result, Err(CoreError::Persistence(_))));
        assert!(engine.rule(&a_com()).is_some());
        assert_eq!(engine.time_left(&a_com()), Some(ms(700)));
    }

    #[test]
    fn test_initialize_replaces_in_memory_state() {
        let (mut engine, store) = engine_with_a_com(1000, 5000);
        engine.track_time(&a_com(), tick(300), t0()).unwrap();

        // Someone else rewrote the rules in the store
        store
            .save_rules(&[Rule::new("b.com", ms(10), ms(10))])
            .unwrap();
        engine.initialize().unwrap();

        assert!(engine.rule(&a_com()).is_none());
        assert!(engine.rule(&Domain::new("b.com")).is_some());
        assert!(engine.rule(&Domain::new("youtube.com")).is_some());
        // Site states were not touched by the rule edit
        assert_eq!(engine.site_state(&a_com()).unwrap().time_spent, ms(300));
    }

    #[test]
    fn test_add_rule_replaces_existing() {
        let (mut engine, store) = engine_with_a_com(1000, 5000);
        engine
            .add_or_replace_rule(Rule::new("www.a.com", ms(2000), ms(0)))
            .unwrap();

        let matching: Vec<_> = engine.rules().iter().filter(|r| r.domain == a_com()).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].time_limit, ms(2000));
        assert_eq!(engine.rules().last().unwrap().domain, a_com());
        assert_eq!(store.load().unwrap().rules, engine.rules());
    }

    #[test]
    fn test_remove_rule_keeps_site_state() {
        let (mut engine, store) = engine_with_a_com(1000, 5000);
        engine.track_time(&a_com(), tick(400), t0()).unwrap();

        assert!(engine.remove_rule(&a_com()).unwrap());
        assert!(!engine.remove_rule(&a_com()).unwrap());
        assert!(engine.rule(&a_com()).is_none());
        assert!(store.load().unwrap().rules.iter().all(|r| r.domain != a_com()));

        // Re-adding resumes from the stale accumulated time
        engine
            .add_or_replace_rule(Rule::new("a.com", ms(1000), ms(5000)))
            .unwrap();
        assert_eq!(engine.time_left(&a_com()), Some(ms(600)));
    }

    #[test]
    fn test_budget_exhaustion() {
        let (mut engine, _store) = engine_with_a_com(1000, 5000);
        let now = t0();

        let outcome = engine.track_time(&a_com(), tick(500), now).unwrap();
        assert!(!outcome.blocked);
        assert_eq!(outcome.event, None);
        assert_eq!(engine.time_left(&a_com()), Some(ms(500)));

        let outcome = engine.track_time(&a_com(), tick(500), now).unwrap();
        assert!(outcome.blocked);
        assert_eq!(
            outcome.event,
            Some(CoreEvent::DomainBlocked {
                domain: a_com(),
                until: later(now, 5000),
            })
        );
        assert!(engine.is_blocked(&a_com(), now));
        assert_eq!(engine.time_left(&a_com()), Some(Duration::ZERO));
    }

    #[test]
    fn test_ticks_discarded_while_blocked() {
        let (mut engine, store) = engine_with_a_com(1000, 5000);
        let now = t0();
        engine.track_time(&a_com(), tick(1000), now).unwrap();
        let saves = store.save_count();

        for step in [1, 1000, 4999] {
            let outcome = engine.track_time(&a_com(), tick(700), later(now, step)).unwrap();
            assert!(outcome.blocked);
            assert_eq!(outcome.event, None);
        }

        assert_eq!(engine.site_state(&a_com()).unwrap().time_spent, ms(1000));
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn test_cooldown_persistence() {
        let (mut engine, _store) = engine_with_a_com(1000, 5000);
        let now = t0();
        engine.track_time(&a_com(), tick(1000), now).unwrap();

        let at_4s = later(now, 4000);
        assert!(engine.is_blocked(&a_com(), at_4s));
        assert_eq!(engine.cooldown_remaining(&a_com(), at_4s), ms(1000));
        assert_eq!(engine.phase(&a_com(), at_4s), Phase::Blocked { until: later(now, 5000) });
    }

    #[test]
    fn test_cooldown_remaining_decreases_to_zero() {
        let (mut engine, _store) = engine_with_a_com(1000, 5000);
        let now = t0();
        engine.track_time(&a_com(), tick(1000), now).unwrap();

        let mut previous = engine.cooldown_remaining(&a_com(), now);
        assert_eq!(previous, ms(5000));
        for step in (500..=6000).step_by(500) {
            let remaining = engine.cooldown_remaining(&a_com(), later(now, step));
            assert!(remaining <= previous);
            previous = remaining;
        }

        assert_eq!(engine.cooldown_remaining(&a_com(), later(now, 5000)), Duration::ZERO);
        assert!(!engine.is_blocked(&a_com(), later(now, 5000)));
    }

    #[test]
    fn test_cooldown_expiry_reset() {
        let (mut engine, _store) = engine_with_a_com(1000, 5000);
        let now = t0();
        engine.track_time(&a_com(), tick(1000), now).unwrap();

        let after = later(now, 5001);
        assert!(!engine.is_blocked(&a_com(), after));
        assert_eq!(engine.phase(&a_com(), after), Phase::Expired);
        // The predicate alone does not reset
        assert!(engine.site_state(&a_com()).unwrap().last_blocked.is_some());

        let outcome = engine.track_time(&a_com(), tick(100), after).unwrap();
        assert!(!outcome.blocked);
        assert_eq!(outcome.event, Some(CoreEvent::DomainReset { domain: a_com() }));
        assert_eq!(engine.time_left(&a_com()), Some(ms(900)));
        assert_eq!(engine.phase(&a_com(), after), Phase::Tracking);
    }

    #[test]
    fn test_reset_then_immediate_reblock() {
        let (mut engine, _store) = engine_with_a_com(1000, 5000);
        let now = t0();
        engine.track_time(&a_com(), tick(1000), now).unwrap();

        let after = later(now, 6000);
        let outcome = engine.track_time(&a_com(), tick(1500), after).unwrap();

        assert!(outcome.blocked);
        assert!(matches!(outcome.event, Some(CoreEvent::DomainBlocked { .. })));
        assert_eq!(engine.site_state(&a_com()).unwrap().time_spent, ms(1500));
        assert_eq!(engine.site_state(&a_com()).unwrap().last_blocked, Some(after));
    }

    #[test]
    fn test_zero_cooldown_never_blocks() {
        let (mut engine, _store) = engine_with_a_com(1000, 0);
        let now = t0();

        assert!(!engine.track_time(&a_com(), tick(1000), now).unwrap().blocked);
        assert!(!engine.is_blocked(&a_com(), now));
        assert!(!engine.track_time(&a_com(), tick(500), now).unwrap().blocked);
        assert!(!engine.is_blocked(&a_com(), now));

        assert_eq!(engine.site_state(&a_com()).unwrap().time_spent, ms(1500));
        assert_eq!(engine.time_left(&a_com()), Some(Duration::ZERO));
        assert_eq!(engine.cooldown_remaining(&a_com(), now), Duration::ZERO);
    }

    #[test]
    fn test_zero_cooldown_ignores_stale_marker() {
        let (mut engine, _store) = engine_with_a_com(1000, 5000);
        let now = t0();
        engine.track_time(&a_com(), tick(1000), now).unwrap();

        // User disables blocking mid-cooldown
        engine
            .add_or_replace_rule(Rule::new("a.com", ms(1000), Duration::ZERO))
            .unwrap();

        assert!(!engine.is_blocked(&a_com(), now));
        assert_eq!(engine.cooldown_remaining(&a_com(), now), Duration::ZERO);
        assert_eq!(engine.phase(&a_com(), now), Phase::Expired);

        // Next tick clears the marker and counts again
        let outcome = engine.track_time(&a_com(), tick(10), now).unwrap();
        assert!(!outcome.blocked);
        assert_eq!(engine.site_state(&a_com()).unwrap().time_spent, ms(10));
    }

    #[test]
    fn test_zero_limit_blocks_on_first_tick() {
        let (mut engine, _store) = engine_with_a_com(0, 1000);
        let outcome = engine.track_time(&a_com(), TimeDelta::zero(), t0()).unwrap();
        assert!(outcome.blocked);
    }

    #[test]
    fn test_unknown_domain() {
        let store = Arc::new(MemoryStore::new());
        let mut engine = engine_with(store.clone());
        let unknown = Domain::new("unknown.com");
        let saves = store.save_count();

        let outcome = engine.track_time(&unknown, tick(500), t0()).unwrap();

        assert!(!outcome.blocked);
        assert!(engine.rule(&unknown).is_none());
        assert!(engine.site_state(&unknown).is_none());
        assert_eq!(engine.time_left(&unknown), None);
        assert_eq!(engine.cooldown_remaining(&unknown, t0()), Duration::ZERO);
        assert!(!engine.sync_state(&unknown, t0()).unwrap());
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn test_time_left_without_site_state() {
        let (engine, _store) = engine_with_a_com(1000, 5000);
        assert_eq!(engine.time_left(&a_com()), Some(ms(1000)));
        assert_eq!(engine.phase(&a_com(), t0()), Phase::Tracking);
    }

    #[test]
    fn test_huge_delta_saturates() {
        let (mut engine, _store) = engine_with_a_com(1000, 5000);
        engine.track_time(&a_com(), tick(10), t0()).unwrap();

        let outcome = engine.track_time(&a_com(), TimeDelta::MAX, t0()).unwrap();
        assert!(outcome.blocked);
        assert!(engine.site_state(&a_com()).unwrap().time_spent > ms(1000));
    }

    #[test]
    fn test_saturated_time_spent_survives_reload() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut engine = TrackingEngine::new(store.clone());
        engine.initialize().unwrap();
        engine
            .add_or_replace_rule(Rule::new("a.com", ms(1000), ms(0)))
            .unwrap();

        for _ in 0..3 {
            engine.track_time(&a_com(), TimeDelta::MAX, t0()).unwrap();
        }
        let spent = engine.site_state(&a_com()).unwrap().time_spent;
        assert_eq!(spent, MAX_MILLIS_DURATION);

        let mut reloaded = TrackingEngine::new(store);
        reloaded.initialize().unwrap();
        assert_eq!(reloaded.site_state(&a_com()).unwrap().time_spent, spent);
    }

    #[test]
    fn test_negative_delta_takes_time_back() {
        let (mut engine, _store) = engine_with_a_com(1000, 5000);
        let b_com = Domain::new("b.com");
        engine
            .add_or_replace_rule(Rule::new("b.com", ms(1000), ms(5000)))
            .unwrap();

        engine.track_time(&b_com, tick(800), t0()).unwrap();
        let outcome = engine.track_time(&b_com, tick(-300), t0()).unwrap();
        assert!(!outcome.blocked);
        assert_eq!(engine.time_left(&b_com), Some(ms(500)));

        // Floors at zero rather than banking credit
        engine.track_time(&b_com, tick(-10_000), t0()).unwrap();
        assert_eq!(engine.site_state(&b_com).unwrap().time_spent, Duration::ZERO);
        engine.track_time(&b_com, TimeDelta::MIN, t0()).unwrap();
        assert_eq!(engine.time_left(&b_com), Some(ms(1000)));
    }

    #[test]
    fn test_negative_delta_while_blocked_stays_blocked() {
        let (mut engine, store) = engine_with_a_com(1000, 5000);
        let now = t0();
        assert!(engine.track_time(&a_com(), tick(1000), now).unwrap().blocked);
        let saves = store.save_count();

        let outcome = engine.track_time(&a_com(), tick(-1), now).unwrap();

        assert_eq!(outcome, TrackOutcome::still_blocked());
        assert_eq!(engine.site_state(&a_com()).unwrap().time_spent, ms(1000));
        assert!(engine.is_blocked(&a_com(), now));
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn test_sync_state() {
        let (mut engine, store) = engine_with_a_com(1000, 5000);
        let now = t0();
        engine.track_time(&a_com(), tick(1000), now).unwrap();

        // Still blocked: nothing to do
        assert!(!engine.sync_state(&a_com(), later(now, 100)).unwrap());
        assert!(engine.is_blocked(&a_com(), later(now, 100)));

        let after = later(now, 5000);
        assert!(engine.sync_state(&a_com(), after).unwrap());
        assert_eq!(engine.site_state(&a_com()), Some(&SiteState::default()));
        assert_eq!(
            store.load().unwrap().site_states.get(&a_com()),
            Some(&SiteState::default())
        );

        // Idempotent
        let saves = store.save_count();
        assert!(!engine.sync_state(&a_com(), after).unwrap());
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn test_failed_save_keeps_mutation() {
        let (mut engine, store) = engine_with_a_com(1000, 5000);
        store.set_fail_saves(true);

        let result = engine.track_time(&a_com(), tick(300), t0());

        assert!(matches!(result, Err(CoreError::Persistence(_))));
        assert_eq!(engine.site_state(&a_com()).unwrap().time_spent, ms(300));
        assert!(store.load().unwrap().site_states.is_empty());
    }

    #[test]
    fn test_persistence_roundtrip() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let now = t0();

        let mut first = TrackingEngine::new(store.clone());
        first.initialize().unwrap();
        first
            .add_or_replace_rule(
                Rule::new("a.com", ms(1000), ms(5000)).with_track_in_background(true),
            )
            .unwrap();
        first
            .add_or_replace_rule(Rule::new("b.com", ms(2000), ms(0)))
            .unwrap();
        first.track_time(&a_com(), tick(1000), now).unwrap();
        first.track_time(&Domain::new("b.com"), tick(500), now).unwrap();

        let mut second = TrackingEngine::new(store);
        second.initialize().unwrap();

        assert_eq!(second.rules(), first.rules());
        assert_eq!(second.site_state(&a_com()), first.site_state(&a_com()));
        assert_eq!(second.site_state(&a_com()).unwrap().last_blocked, Some(now));
        assert!(second.rule(&a_com()).unwrap().track_in_background);
        assert!(second.is_blocked(&a_com(), later(now, 4000)));
        assert_eq!(second.time_left(&Domain::new("b.com")), Some(ms(1500)));
    }

    #[test]
    fn test_status_summary() {
        let (mut engine, _store) = engine_with_a_com(1000, 5000);
        let now = t0();
        engine.track_time(&a_com(), tick(1000), now).unwrap();

        let status = engine.status(&a_com(), later(now, 1000));
        assert!(status.is_blocked());
        assert_eq!(status.time_spent, ms(1000));
        assert_eq!(status.cooldown_remaining, ms(4000));
        assert_eq!(status.time_left, Some(Duration::ZERO));
        assert_eq!(status.rule.unwrap().cooldown, ms(5000));

        let unknown = engine.status(&Domain::new("x.org"), now);
        assert!(!unknown.is_blocked());
        assert!(unknown.rule.is_none());
        assert_eq!(unknown.time_left, None);
    }
}
