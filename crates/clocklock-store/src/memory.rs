//! In-memory store for tests and ephemeral runs

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::{AppState, Rule, SiteStates, Store, StoreError, StoreResult};

/// Store that keeps a private copy of the state in process memory.
///
/// Loads hand out clones, so an engine mutating its state never touches
/// what is "on disk" until it saves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<AppState>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing state
    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Make every subsequent `load` fail
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent save fail
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves of either record
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, AppState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn check_save(&self) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("save failure injected".into()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn load(&self) -> StoreResult<AppState> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("load failure injected".into()));
        }
        Ok(self.lock()?.clone())
    }

    fn save_rules(&self, rules: &[Rule]) -> StoreResult<()> {
        self.check_save()?;
        self.lock()?.rules = rules.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        debug!(rule_count = rules.len(), "Rules saved (memory)");
        Ok(())
    }

    fn save_site_states(&self, site_states: &SiteStates) -> StoreResult<()> {
        self.check_save()?;
        self.lock()?.site_states = site_states.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.state.lock().is_ok()
            && !self.fail_loads.load(Ordering::SeqCst)
            && !self.fail_saves.load(Ordering::SeqCst)
    }
}
