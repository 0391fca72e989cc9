use super::connection::Store;
use super::models::{OutboxEntry, TypeId};
use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use rusqlite::params;

impl Store {
    /// Append a price observation to the FIFO upload queue.
    pub fn enqueue_outbox(&self, type_id: TypeId, value: f64, captured_ts: DateTime<Utc>) -> EngineResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO outbox (type_id, value, captured_ts, attempts) VALUES (?1, ?2, ?3, 0)",
            params![type_id, value, captured_ts],
        )
        .map_err(EngineError::Database)?;
        Ok(conn.last_insert_rowid())
    }

    /// Oldest-first batch of pending entries, for the uplink worker to
    /// apply its own backoff-eligibility filter over.
    pub fn outbox_batch(&self, limit: u32) -> EngineResult<Vec<OutboxEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, type_id, value, captured_ts, attempts, last_attempt_ts, last_error
                 FROM outbox ORDER BY id ASC LIMIT ?1",
            )
            .map_err(EngineError::Database)?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(OutboxEntry {
                    id: row.get(0)?,
                    type_id: row.get(1)?,
                    value: row.get(2)?,
                    captured_ts: row.get(3)?,
                    attempts: row.get(4)?,
                    last_attempt_ts: row.get(5)?,
                    last_error: row.get(6)?,
                })
            })
            .map_err(EngineError::Database)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EngineError::Database)?);
        }
        Ok(out)
    }

    pub fn record_outbox_failure(&self, id: i64, attempted_at: DateTime<Utc>, error: &str) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE outbox SET attempts = attempts + 1, last_attempt_ts = ?1, last_error = ?2 WHERE id = ?3",
            params![attempted_at, error, id],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }

    /// Drop a successfully uploaded entry (at-least-once: only removed
    /// after the cloud confirms receipt).
    pub fn remove_outbox_entry(&self, id: i64) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM outbox WHERE id = ?1", params![id])
            .map_err(EngineError::Database)?;
        Ok(())
    }

    pub fn outbox_len(&self) -> EngineResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM outbox", [], |r| r.get(0))
            .map_err(EngineError::Database)
    }
}

/// Whether an entry is due for another upload attempt, given `now`. Base
/// 2^attempts seconds, capped at one hour, matching [`EngineError::retry_after_seconds`].
pub fn is_due(entry: &OutboxEntry, now: DateTime<Utc>) -> bool {
    let Some(last_attempt) = entry.last_attempt_ts else {
        return true;
    };
    let capped = entry.attempts.min(12);
    let backoff_secs = (2u64.saturating_pow(capped)).min(3600);
    now.signed_duration_since(last_attempt).num_seconds() >= backoff_secs as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_then_batch_fifo_order() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.enqueue_outbox(1, 1.0, now).unwrap();
        store.enqueue_outbox(2, 2.0, now).unwrap();

        let batch = store.outbox_batch(10).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].type_id, 1);
        assert_eq!(batch[1].type_id, 2);
    }

    #[test]
    fn fresh_entry_is_always_due() {
        let entry = OutboxEntry {
            id: 1,
            type_id: 1,
            value: 1.0,
            captured_ts: Utc::now(),
            attempts: 0,
            last_attempt_ts: None,
            last_error: None,
        };
        assert!(is_due(&entry, Utc::now()));
    }

    #[test]
    fn recently_failed_entry_is_not_due_immediately() {
        let now = Utc::now();
        let entry = OutboxEntry {
            id: 1,
            type_id: 1,
            value: 1.0,
            captured_ts: now,
            attempts: 3,
            last_attempt_ts: Some(now),
            last_error: Some("timeout".to_string()),
        };
        assert!(!is_due(&entry, now + chrono::Duration::seconds(1)));
        assert!(is_due(&entry, now + chrono::Duration::seconds(9)));
    }

    #[test]
    fn successful_upload_removes_entry() {
        let store = Store::open_in_memory().unwrap();
        let id = store.enqueue_outbox(1, 1.0, Utc::now()).unwrap();
        store.remove_outbox_entry(id).unwrap();
        assert_eq!(store.outbox_len().unwrap(), 0);
    }
}
