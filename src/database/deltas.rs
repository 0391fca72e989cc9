use super::connection::Store;
use super::models::{ContextTag, Delta, TypeId};
use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

fn row_to_delta(row: &Row) -> rusqlite::Result<Delta> {
    let tag_str: String = row.get(7)?;
    Ok(Delta {
        id: row.get(0)?,
        scope: row.get(1)?,
        run_id: row.get(2)?,
        page_id: row.get(3)?,
        slot_id: row.get(4)?,
        type_id: row.get(5)?,
        signed_quantity: row.get(6)?,
        context_tag: ContextTag::parse(&tag_str),
        ts: row.get(8)?,
    })
}

const DELTA_COLUMNS: &str =
    "id, scope, run_id, page_id, slot_id, type_id, signed_quantity, context_tag, ts";

impl Store {
    /// Append one immutable delta record. Deltas are never updated or
    /// deleted except by the `/runs/reset` operation (§6).
    pub fn insert_delta(
        &self,
        scope: &str,
        run_id: Option<&str>,
        page_id: i64,
        slot_id: i64,
        type_id: TypeId,
        signed_quantity: i64,
        context_tag: ContextTag,
        ts: DateTime<Utc>,
    ) -> EngineResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO deltas (scope, run_id, page_id, slot_id, type_id, signed_quantity, context_tag, ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                scope,
                run_id,
                page_id,
                slot_id,
                type_id,
                signed_quantity,
                context_tag.as_str(),
                ts,
            ],
        )
        .map_err(EngineError::Database)?;
        Ok(conn.last_insert_rowid())
    }

    pub fn deltas_for_run(&self, run_id: &str) -> EngineResult<Vec<Delta>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM deltas WHERE run_id = ?1 ORDER BY ts ASC", DELTA_COLUMNS);
        let mut stmt = conn.prepare(&sql).map_err(EngineError::Database)?;
        let rows = stmt
            .query_map(params![run_id], row_to_delta)
            .map_err(EngineError::Database)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EngineError::Database)?);
        }
        Ok(out)
    }

    /// Re-point every delta belonging to a consolidated sub-zone run onto
    /// its parent run id, so valuation aggregates the whole excursion.
    pub fn repoint_deltas_to_parent(&self, child_run_id: &str, parent_run_id: &str) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE deltas SET run_id = ?1 WHERE run_id = ?2",
            params![parent_run_id, child_run_id],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }

    /// Delete all runs and deltas for a scope, preserving slot_state,
    /// prices, items, and cloud caches (§6 `/runs/reset`).
    pub fn reset_runs_and_deltas(&self, scope: &str) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM deltas WHERE scope = ?1", params![scope])
            .map_err(EngineError::Database)?;
        conn.execute("DELETE FROM runs WHERE scope = ?1", params![scope])
            .map_err(EngineError::Database)?;
        conn.execute(
            "DELETE FROM run_children WHERE parent_run_id NOT IN (SELECT id FROM runs)",
            [],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_fetch_deltas_for_run() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_delta("p1", Some("run1"), 0, 1, 7, 3, ContextTag::PickItems, Utc::now())
            .unwrap();
        store
            .insert_delta("p1", Some("run1"), 0, 2, 8, -1, ContextTag::Recycle, Utc::now())
            .unwrap();

        let deltas = store.deltas_for_run("run1").unwrap();
        assert_eq!(deltas.len(), 2);
    }

    #[test]
    fn reset_preserves_other_scopes() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_delta("p1", Some("run1"), 0, 1, 7, 3, ContextTag::PickItems, Utc::now())
            .unwrap();
        store
            .insert_delta("p2", Some("run2"), 0, 1, 7, 3, ContextTag::PickItems, Utc::now())
            .unwrap();

        store.reset_runs_and_deltas("p1").unwrap();
        assert!(store.deltas_for_run("run1").unwrap().is_empty());
        assert_eq!(store.deltas_for_run("run2").unwrap().len(), 1);
    }
}
