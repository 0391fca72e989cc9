use super::connection::Store;
use super::models::{Price, PriceSource, TypeId};
use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl Store {
    /// Record a locally known price (manual entry or exchange-learned).
    pub fn set_local_price(&self, scope: &str, type_id: TypeId, value: f64, source: PriceSource, updated_ts: DateTime<Utc>) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO prices (scope, type_id, value, source, updated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(scope, type_id) DO UPDATE SET
                value = excluded.value, source = excluded.source, updated_ts = excluded.updated_ts",
            params![scope, type_id, value, source.as_str(), updated_ts],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }

    pub fn get_local_price(&self, scope: &str, type_id: TypeId) -> EngineResult<Option<Price>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT scope, type_id, value, source, updated_ts FROM prices WHERE scope = ?1 AND type_id = ?2",
            params![scope, type_id],
            |row| {
                let source: String = row.get(3)?;
                Ok(Price {
                    scope: row.get(0)?,
                    type_id: row.get(1)?,
                    value: row.get(2)?,
                    source: PriceSource::parse(&source),
                    updated_ts: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(EngineError::Database)
    }

    pub fn list_local_prices(&self, scope: &str) -> EngineResult<Vec<Price>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT scope, type_id, value, source, updated_ts FROM prices WHERE scope = ?1")
            .map_err(EngineError::Database)?;
        let rows = stmt
            .query_map(params![scope], |row| {
                let source: String = row.get(3)?;
                Ok(Price {
                    scope: row.get(0)?,
                    type_id: row.get(1)?,
                    value: row.get(2)?,
                    source: PriceSource::parse(&source),
                    updated_ts: row.get(4)?,
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
    fn set_and_get_local_price() {
        let store = Store::open_in_memory().unwrap();
        store
            .set_local_price("p1", 9, 12.5, PriceSource::Manual, Utc::now())
            .unwrap();
        let price = store.get_local_price("p1", 9).unwrap().unwrap();
        assert_eq!(price.value, 12.5);
        assert_eq!(price.source, PriceSource::Manual);
    }

    #[test]
    fn upsert_overwrites_existing_value() {
        let store = Store::open_in_memory().unwrap();
        let t1 = Utc::now();
        store.set_local_price("p1", 9, 10.0, PriceSource::Manual, t1).unwrap();
        let t2 = t1 + chrono::Duration::seconds(5);
        store
            .set_local_price("p1", 9, 20.0, PriceSource::ExchangeLearned, t2)
            .unwrap();
        let price = store.get_local_price("p1", 9).unwrap().unwrap();
        assert_eq!(price.value, 20.0);
        assert_eq!(price.source, PriceSource::ExchangeLearned);
    }
}
