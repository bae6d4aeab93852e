//! Store trait definitions

use crate::{AppState, Rule, SiteStates, StoreResult};

/// Load/save port for the tracking engine.
///
/// Saves always carry a complete snapshot of one record; the two records
/// (rules, site states) are written independently and are not transactional
/// with respect to each other.
pub trait Store: Send + Sync {
    /// Load everything. Returns `AppState::default()` if nothing was stored yet.
    fn load(&self) -> StoreResult<AppState>;

    /// Replace the stored rule set
    fn save_rules(&self, rules: &[Rule]) -> StoreResult<()>;

    /// Replace the stored site-state map
    fn save_site_states(&self, site_states: &SiteStates) -> StoreResult<()>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
