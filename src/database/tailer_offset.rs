use super::connection::Store;
use crate::errors::{EngineError, EngineResult};
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailerOffset {
    pub file_id: String,
    pub byte_offset: u64,
}

impl Store {
    /// Persisted tailer position, keyed by log path. A mismatched
    /// `file_id` on read tells the tailer the file was rotated or
    /// truncated since the offset was last saved.
    pub fn get_tailer_offset(&self, log_path: &str) -> EngineResult<Option<TailerOffset>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT file_id, byte_offset FROM tailer_offset WHERE log_path = ?1",
            params![log_path],
            |row| {
                Ok(TailerOffset {
                    file_id: row.get(0)?,
                    byte_offset: row.get::<_, i64>(1)? as u64,
                })
            },
        )
        .optional()
        .map_err(EngineError::Database)
    }

    pub fn save_tailer_offset(&self, log_path: &str, file_id: &str, byte_offset: u64) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tailer_offset (log_path, file_id, byte_offset) VALUES (?1, ?2, ?3)
             ON CONFLICT(log_path) DO UPDATE SET file_id = excluded.file_id, byte_offset = excluded.byte_offset",
            params![log_path, file_id, byte_offset as i64],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_get_offset() {
        let store = Store::open_in_memory().unwrap();
        store.save_tailer_offset("/log/path", "inode-1", 1024).unwrap();
        let offset = store.get_tailer_offset("/log/path").unwrap().unwrap();
        assert_eq!(offset.file_id, "inode-1");
        assert_eq!(offset.byte_offset, 1024);
    }

    #[test]
    fn rotation_changes_file_id_on_next_save() {
        let store = Store::open_in_memory().unwrap();
        store.save_tailer_offset("/log/path", "inode-1", 1024).unwrap();
        store.save_tailer_offset("/log/path", "inode-2", 0).unwrap();
        let offset = store.get_tailer_offset("/log/path").unwrap().unwrap();
        assert_eq!(offset.file_id, "inode-2");
        assert_eq!(offset.byte_offset, 0);
    }
}
