use super::connection::Store;
use super::models::Run;
use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

fn row_to_run(row: &Row) -> rusqlite::Result<Run> {
    let children_json: String = row.get(10)?;
    let consolidated_children: Vec<String> =
        serde_json::from_str(&children_json).unwrap_or_default();
    Ok(Run {
        id: row.get(0)?,
        scope: row.get(1)?,
        start_ts: row.get(2)?,
        end_ts: row.get(3)?,
        zone_signature: row.get(4)?,
        level_id: row.get(5)?,
        level_type: row.get(6)?,
        level_uid: row.get(7)?,
        is_hub_zone: row.get::<_, i64>(8)? != 0,
        is_sub_zone: row.get::<_, i64>(9)? != 0,
        parent_run_id: row.get(11)?,
        consolidated_children,
    })
}

const RUN_COLUMNS: &str = "id, scope, start_ts, end_ts, zone_signature, level_id, level_type, \
     level_uid, is_hub_zone, is_sub_zone, consolidated_children, parent_run_id";

impl Store {
    pub fn insert_run(&self, run: &Run) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        let children_json =
            serde_json::to_string(&run.consolidated_children).unwrap_or_else(|_| "[]".to_string());
        conn.execute(
            "INSERT INTO runs (id, scope, start_ts, end_ts, zone_signature, level_id, level_type,
                 level_uid, is_hub_zone, is_sub_zone, parent_run_id, consolidated_children)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                run.id,
                run.scope,
                run.start_ts,
                run.end_ts,
                run.zone_signature,
                run.level_id,
                run.level_type,
                run.level_uid,
                run.is_hub_zone as i64,
                run.is_sub_zone as i64,
                run.parent_run_id,
                children_json,
            ],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }

    pub fn close_run(&self, run_id: &str, end_ts: DateTime<Utc>) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE runs SET end_ts = ?1 WHERE id = ?2",
            params![end_ts, run_id],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }

    /// Splice a finished sub-zone run's id into its parent's consolidated
    /// children list (§4.5).
    pub fn consolidate_child_run(&self, parent_run_id: &str, child_run_id: &str) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO run_children (parent_run_id, child_run_id) VALUES (?1, ?2)",
            params![parent_run_id, child_run_id],
        )
        .map_err(EngineError::Database)?;

        let existing: String = conn
            .query_row(
                "SELECT consolidated_children FROM runs WHERE id = ?1",
                params![parent_run_id],
                |r| r.get(0),
            )
            .map_err(EngineError::Database)?;
        let mut children: Vec<String> = serde_json::from_str(&existing).unwrap_or_default();
        children.push(child_run_id.to_string());
        let updated = serde_json::to_string(&children).unwrap_or_else(|_| "[]".to_string());
        conn.execute(
            "UPDATE runs SET consolidated_children = ?1 WHERE id = ?2",
            params![updated, parent_run_id],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> EngineResult<Option<Run>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        conn.query_row(&sql, params![run_id], row_to_run)
            .optional()
            .map_err(EngineError::Database)
    }

    pub fn list_runs(&self, scope: &str, limit: u32, offset: u32) -> EngineResult<Vec<Run>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM runs WHERE scope = ?1 AND is_sub_zone = 0 \
             ORDER BY start_ts DESC LIMIT ?2 OFFSET ?3",
            RUN_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(EngineError::Database)?;
        let rows = stmt
            .query_map(params![scope, limit, offset], row_to_run)
            .map_err(EngineError::Database)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EngineError::Database)?);
        }
        Ok(out)
    }

    /// The scope's currently open run, if any (end_ts IS NULL).
    pub fn open_run(&self, scope: &str) -> EngineResult<Option<Run>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM runs WHERE scope = ?1 AND end_ts IS NULL ORDER BY start_ts DESC LIMIT 1",
            RUN_COLUMNS
        );
        conn.query_row(&sql, params![scope], row_to_run)
            .optional()
            .map_err(EngineError::Database)
    }

    /// The scope of the most recently started run, for CLI commands that
    /// run without a live Collector to ask its `CollectorHandle` directly.
    pub fn most_recent_scope(&self) -> EngineResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT scope FROM runs ORDER BY start_ts DESC LIMIT 1", [], |row| row.get(0))
            .optional()
            .map_err(EngineError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_run(scope: &str) -> Run {
        Run {
            id: Uuid::new_v4().to_string(),
            scope: scope.to_string(),
            start_ts: Utc::now(),
            end_ts: None,
            zone_signature: "forest_01".to_string(),
            level_id: 12,
            level_type: "map".to_string(),
            level_uid: "abc".to_string(),
            is_hub_zone: false,
            is_sub_zone: false,
            parent_run_id: None,
            consolidated_children: Vec::new(),
        }
    }

    #[test]
    fn insert_and_fetch_open_run() {
        let store = Store::open_in_memory().unwrap();
        let run = sample_run("p1");
        store.insert_run(&run).unwrap();

        let open = store.open_run("p1").unwrap().unwrap();
        assert_eq!(open.id, run.id);
        assert!(open.end_ts.is_none());
    }

    #[test]
    fn closing_run_clears_open_run_lookup() {
        let store = Store::open_in_memory().unwrap();
        let run = sample_run("p1");
        store.insert_run(&run).unwrap();
        store.close_run(&run.id, Utc::now()).unwrap();
        assert!(store.open_run("p1").unwrap().is_none());
    }

    #[test]
    fn sub_zone_consolidation_appends_child_id() {
        let store = Store::open_in_memory().unwrap();
        let parent = sample_run("p1");
        let mut child = sample_run("p1");
        child.is_sub_zone = true;
        child.parent_run_id = Some(parent.id.clone());
        store.insert_run(&parent).unwrap();
        store.insert_run(&child).unwrap();

        store.consolidate_child_run(&parent.id, &child.id).unwrap();
        let reloaded = store.get_run(&parent.id).unwrap().unwrap();
        assert_eq!(reloaded.consolidated_children, vec![child.id]);
    }
}
