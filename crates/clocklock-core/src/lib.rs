//! Time-tracking engine and session facade for clocklockd
//!
//! This crate is the heart of clocklock, containing:
//! - Per-domain time accounting against a rule's budget
//! - The block/cooldown state machine (Tracking -> Blocked -> Expired -> Tracking)
//! - The session facade that turns protocol commands into engine calls
//!
//! The engine has no timer. Cooldown expiry is a predicate over
//! `(now, last_blocked, cooldown)` and is only applied when a tick or a sync
//! arrives after the fact.

mod engine;
mod events;
mod facade;
mod state;

pub use engine::*;
pub use events::*;
pub use facade::*;
pub use state::*;

pub use clocklock_store::{AppState, Rule, SiteState, SiteStates};

use clocklock_store::StoreError;
use thiserror::Error;

/// Core errors
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;
