use crate::errors::{EngineError, EngineResult};
use rusqlite::Connection;

/// Forward-only, idempotent migration runner. Each migration is applied at
/// most once, gated by the `schema_version` table; there is no down path,
/// matching the Store's append-mostly, single-writer design.
const MIGRATIONS: &[(&i64, &str)] = &[];

pub fn run(conn: &Connection) -> EngineResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        [],
    )
    .map_err(EngineError::Database)?;

    let current: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
        .map_err(EngineError::Database)?;

    if current < 1 {
        apply_v1(conn)?;
        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])
            .map_err(EngineError::Database)?;
    }

    let _ = MIGRATIONS;
    Ok(())
}

fn apply_v1(conn: &Connection) -> EngineResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS slot_state (
            scope     TEXT NOT NULL,
            page_id   INTEGER NOT NULL,
            slot_id   INTEGER NOT NULL,
            type_id   INTEGER NOT NULL,
            quantity  INTEGER NOT NULL,
            PRIMARY KEY (scope, page_id, slot_id)
        );

        CREATE TABLE IF NOT EXISTS runs (
            id                     TEXT PRIMARY KEY,
            scope                  TEXT NOT NULL,
            start_ts               TEXT NOT NULL,
            end_ts                 TEXT,
            zone_signature         TEXT NOT NULL,
            level_id               INTEGER NOT NULL,
            level_type             TEXT NOT NULL,
            level_uid              TEXT NOT NULL,
            is_hub_zone            INTEGER NOT NULL DEFAULT 0,
            is_sub_zone            INTEGER NOT NULL DEFAULT 0,
            parent_run_id          TEXT,
            consolidated_children  TEXT NOT NULL DEFAULT '[]'
        );
        CREATE INDEX IF NOT EXISTS idx_runs_scope_end_ts ON runs(scope, end_ts);

        CREATE TABLE IF NOT EXISTS run_children (
            parent_run_id TEXT NOT NULL,
            child_run_id  TEXT NOT NULL,
            PRIMARY KEY (parent_run_id, child_run_id)
        );

        CREATE TABLE IF NOT EXISTS deltas (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            scope           TEXT NOT NULL,
            run_id          TEXT,
            page_id         INTEGER NOT NULL,
            slot_id         INTEGER NOT NULL,
            type_id         INTEGER NOT NULL,
            signed_quantity INTEGER NOT NULL,
            context_tag     TEXT NOT NULL,
            ts              TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_deltas_scope_run_id ON deltas(scope, run_id);
        CREATE INDEX IF NOT EXISTS idx_deltas_scope_ts ON deltas(scope, ts);

        CREATE TABLE IF NOT EXISTS items (
            type_id          INTEGER PRIMARY KEY,
            name             TEXT NOT NULL,
            icon_ref         TEXT,
            is_base_currency INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS prices (
            scope       TEXT NOT NULL,
            type_id     INTEGER NOT NULL,
            value       REAL NOT NULL,
            source      TEXT NOT NULL,
            updated_ts  TEXT NOT NULL,
            PRIMARY KEY (scope, type_id)
        );

        CREATE TABLE IF NOT EXISTS cloud_prices (
            type_id             INTEGER PRIMARY KEY,
            median              REAL NOT NULL,
            p10                 REAL NOT NULL,
            p90                 REAL NOT NULL,
            contributor_count   INTEGER NOT NULL,
            cloud_updated_ts    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS price_history (
            type_id              INTEGER NOT NULL,
            hour_bucket          INTEGER NOT NULL,
            median               REAL NOT NULL,
            p10                  REAL NOT NULL,
            p90                  REAL NOT NULL,
            submission_count     INTEGER NOT NULL,
            unique_device_count  INTEGER NOT NULL,
            PRIMARY KEY (type_id, hour_bucket)
        );

        CREATE TABLE IF NOT EXISTS outbox (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            type_id          INTEGER NOT NULL,
            value            REAL NOT NULL,
            captured_ts      TEXT NOT NULL,
            attempts         INTEGER NOT NULL DEFAULT 0,
            last_attempt_ts  TEXT,
            last_error       TEXT
        );

        CREATE TABLE IF NOT EXISTS settings (
            key    TEXT PRIMARY KEY,
            value  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tailer_offset (
            log_path     TEXT PRIMARY KEY,
            file_id      TEXT NOT NULL,
            byte_offset  INTEGER NOT NULL
        );
        ",
    )
    .map_err(EngineError::Database)
}
