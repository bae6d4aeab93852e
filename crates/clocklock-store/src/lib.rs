//! Persistence layer for clocklock
//!
//! Provides:
//! - The persisted data model (rules, site states)
//! - The `Store` port the tracking engine loads from and saves to
//! - An in-memory store for tests
//! - A SQLite key-value store for the daemon

mod memory;
mod model;
mod sqlite;
mod traits;

pub use memory::*;
pub use model::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
