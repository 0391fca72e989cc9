use super::connection::Store;
use super::models::{CloudPrice, TypeId};
use crate::errors::{EngineError, EngineResult};
use rusqlite::{params, OptionalExtension};

impl Store {
    /// Replace the cached cloud aggregate for a TypeId (downlink refresh).
    pub fn upsert_cloud_price(&self, price: &CloudPrice) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO cloud_prices (type_id, median, p10, p90, contributor_count, cloud_updated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(type_id) DO UPDATE SET
                median = excluded.median, p10 = excluded.p10, p90 = excluded.p90,
                contributor_count = excluded.contributor_count,
                cloud_updated_ts = excluded.cloud_updated_ts",
            params![
                price.type_id,
                price.median,
                price.p10,
                price.p90,
                price.contributor_count,
                price.cloud_updated_ts,
            ],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }

    pub fn get_cloud_price(&self, type_id: TypeId) -> EngineResult<Option<CloudPrice>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT type_id, median, p10, p90, contributor_count, cloud_updated_ts FROM cloud_prices WHERE type_id = ?1",
            params![type_id],
            |row| {
                Ok(CloudPrice {
                    type_id: row.get(0)?,
                    median: row.get(1)?,
                    p10: row.get(2)?,
                    p90: row.get(3)?,
                    contributor_count: row.get(4)?,
                    cloud_updated_ts: row.get(5)?,
                })
            },
        )
        .optional()
        .map_err(EngineError::Database)
    }

    pub fn list_cloud_prices(&self) -> EngineResult<Vec<CloudPrice>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT type_id, median, p10, p90, contributor_count, cloud_updated_ts FROM cloud_prices")
            .map_err(EngineError::Database)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CloudPrice {
                    type_id: row.get(0)?,
                    median: row.get(1)?,
                    p10: row.get(2)?,
                    p90: row.get(3)?,
                    contributor_count: row.get(4)?,
                    cloud_updated_ts: row.get(5)?,
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
    use chrono::Utc;

    #[test]
    fn upsert_then_get_cloud_price() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_cloud_price(&CloudPrice {
                type_id: 3,
                median: 5.0,
                p10: 4.0,
                p90: 6.0,
                contributor_count: 12,
                cloud_updated_ts: Utc::now(),
            })
            .unwrap();
        let cp = store.get_cloud_price(3).unwrap().unwrap();
        assert_eq!(cp.contributor_count, 12);
    }
}
