use crate::errors::{EngineError, EngineResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Main Store connection wrapper. A single `rusqlite::Connection` behind a
/// mutex is sufficient: the engine has exactly one writer (the Collector)
/// and reads are infrequent and cheap (HTTP boundary, Cloud Sync Worker).
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the Store database at `db_path` and run any pending
    /// migrations.
    pub fn new(db_path: &Path) -> EngineResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| EngineError::StoreFatal(format!("failed to open {:?}: {}", db_path, e)))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(EngineError::Database)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(EngineError::Database)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// In-memory Store, used by tests.
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory().map_err(EngineError::Database)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        super::migrations::run(&conn)
    }

    /// Coarse row counts, surfaced at the `status` HTTP resource.
    pub fn stats(&self) -> EngineResult<StoreStats> {
        let conn = self.conn.lock().unwrap();
        let runs: i64 = conn.query_row("SELECT COUNT(*) FROM runs", [], |r| r.get(0))?;
        let deltas: i64 = conn.query_row("SELECT COUNT(*) FROM deltas", [], |r| r.get(0))?;
        let items: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |r| r.get(0))?;
        let outbox_pending: i64 =
            conn.query_row("SELECT COUNT(*) FROM outbox", [], |r| r.get(0))?;
        Ok(StoreStats {
            runs,
            deltas,
            items,
            outbox_pending,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub runs: i64,
    pub deltas: i64,
    pub items: i64,
    pub outbox_pending: i64,
}

/// One-shot legacy migration: if a deprecated single-file Store exists and
/// the canonical one does not yet, copy it into place (§6).
pub fn migrate_legacy_store_if_present(canonical_path: &Path) -> EngineResult<bool> {
    if canonical_path.exists() {
        return Ok(false);
    }
    let Some(legacy_path) = crate::paths::get_legacy_store_db_path() else {
        return Ok(false);
    };
    if !legacy_path.exists() {
        return Ok(false);
    }
    if let Some(parent) = canonical_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(&legacy_path, canonical_path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_and_migrates_in_memory() {
        let store = Store::open_in_memory().unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.runs, 0);
        assert_eq!(stats.deltas, 0);
    }

    #[test]
    fn legacy_migration_skips_when_canonical_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("lootwarden.db");
        std::fs::write(&canonical, b"existing").unwrap();
        let migrated = migrate_legacy_store_if_present(&canonical).unwrap();
        assert!(!migrated);
    }
}
