use super::connection::Store;
use crate::errors::{EngineError, EngineResult};
use rusqlite::{params, OptionalExtension};

impl Store {
    pub fn get_setting(&self, key: &str) -> EngineResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT value FROM settings WHERE key = ?1", params![key], |r| r.get(0))
            .optional()
            .map_err(EngineError::Database)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_setting("device_label").unwrap().is_none());
        store.set_setting("device_label", "My PC").unwrap();
        assert_eq!(store.get_setting("device_label").unwrap().unwrap(), "My PC");
    }
}
