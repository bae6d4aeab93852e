//! SQLite-based store implementation
//!
//! Two JSON documents in a key-value table: `rules` and `siteStates`. Each
//! save overwrites one document in a single statement.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AppState, Rule, SiteStates, Store, StoreError, StoreResult};

pub const RULES_KEY: &str = "rules";
pub const SITE_STATES_KEY: &str = "siteStates";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".into()))
    }

    fn get<T: DeserializeOwned>(conn: &Connection, key: &str) -> StoreResult<Option<T>> {
        let json: Option<String> = conn
            .query_row("SELECT value_json FROM kv WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let json = serde_json::to_string(value)?;
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO kv (key, value_json, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key)
            DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at
            "#,
            params![key, json],
        )?;

        Ok(())
    }
}

impl Store for SqliteStore {
    fn load(&self) -> StoreResult<AppState> {
        let conn = self.lock()?;

        let rules: Vec<Rule> = Self::get(&conn, RULES_KEY)?.unwrap_or_default();
        let site_states: SiteStates = Self::get(&conn, SITE_STATES_KEY)?.unwrap_or_default();

        debug!(
            rule_count = rules.len(),
            site_count = site_states.len(),
            "State loaded"
        );

        Ok(AppState { rules, site_states })
    }

    fn save_rules(&self, rules: &[Rule]) -> StoreResult<()> {
        self.put(RULES_KEY, rules)?;
        debug!(rule_count = rules.len(), "Rules saved");
        Ok(())
    }

    fn save_site_states(&self, site_states: &SiteStates) -> StoreResult<()> {
        self.put(SITE_STATES_KEY, site_states)?;
        debug!(site_count = site_states.len(), "Site states saved");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
