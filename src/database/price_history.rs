use super::connection::Store;
use super::models::{PriceHistoryRow, TypeId};
use crate::errors::{EngineError, EngineResult};
use rusqlite::params;

impl Store {
    pub fn upsert_price_history(&self, row: &PriceHistoryRow) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO price_history (type_id, hour_bucket, median, p10, p90, submission_count, unique_device_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(type_id, hour_bucket) DO UPDATE SET
                median = excluded.median, p10 = excluded.p10, p90 = excluded.p90,
                submission_count = excluded.submission_count,
                unique_device_count = excluded.unique_device_count",
            params![
                row.type_id,
                row.hour_bucket,
                row.median,
                row.p10,
                row.p90,
                row.submission_count,
                row.unique_device_count,
            ],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }

    pub fn price_history(&self, type_id: TypeId, since_hour_bucket: i64) -> EngineResult<Vec<PriceHistoryRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT type_id, hour_bucket, median, p10, p90, submission_count, unique_device_count
                 FROM price_history WHERE type_id = ?1 AND hour_bucket >= ?2 ORDER BY hour_bucket ASC",
            )
            .map_err(EngineError::Database)?;
        let rows = stmt
            .query_map(params![type_id, since_hour_bucket], |row| {
                Ok(PriceHistoryRow {
                    type_id: row.get(0)?,
                    hour_bucket: row.get(1)?,
                    median: row.get(2)?,
                    p10: row.get(3)?,
                    p90: row.get(4)?,
                    submission_count: row.get(5)?,
                    unique_device_count: row.get(6)?,
                })
            })
            .map_err(EngineError::Database)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EngineError::Database)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_query_since_bucket() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_price_history(&PriceHistoryRow {
                type_id: 1,
                hour_bucket: 100,
                median: 2.0,
                p10: 1.5,
                p90: 2.5,
                submission_count: 4,
                unique_device_count: 3,
            })
            .unwrap();
        store
            .upsert_price_history(&PriceHistoryRow {
                type_id: 1,
                hour_bucket: 99,
                median: 1.8,
                p10: 1.4,
                p90: 2.2,
                submission_count: 2,
                unique_device_count: 2,
            })
            .unwrap();

        let rows = store.price_history(1, 100).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hour_bucket, 100);
    }
}
