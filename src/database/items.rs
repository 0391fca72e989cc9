use super::connection::Store;
use super::models::{Item, TypeId};
use crate::errors::{EngineError, EngineResult};
use rusqlite::{params, OptionalExtension};

impl Store {
    pub fn upsert_item(&self, item: &Item) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO items (type_id, name, icon_ref, is_base_currency)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(type_id) DO UPDATE SET
                name = excluded.name,
                icon_ref = excluded.icon_ref,
                is_base_currency = excluded.is_base_currency",
            params![
                item.type_id,
                item.name,
                item.icon_ref,
                item.is_base_currency as i64
            ],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }

    pub fn get_item(&self, type_id: TypeId) -> EngineResult<Option<Item>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT type_id, name, icon_ref, is_base_currency FROM items WHERE type_id = ?1",
            params![type_id],
            |row| {
                Ok(Item {
                    type_id: row.get(0)?,
                    name: row.get(1)?,
                    icon_ref: row.get(2)?,
                    is_base_currency: row.get::<_, i64>(3)? != 0,
                })
            },
        )
        .optional()
        .map_err(EngineError::Database)
    }

    pub fn list_items(&self) -> EngineResult<Vec<Item>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT type_id, name, icon_ref, is_base_currency FROM items")
            .map_err(EngineError::Database)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Item {
                    type_id: row.get(0)?,
                    name: row.get(1)?,
                    icon_ref: row.get(2)?,
                    is_base_currency: row.get::<_, i64>(3)? != 0,
                })
            })
            .map_err(EngineError::Database)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EngineError::Database)?);
        }
        Ok(out)
    }

    pub fn base_currency_type_id(&self) -> EngineResult<Option<TypeId>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT type_id FROM items WHERE is_base_currency = 1 LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(EngineError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_get() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_item(&Item {
                type_id: 1,
                name: "Gold Coin".to_string(),
                icon_ref: None,
                is_base_currency: true,
            })
            .unwrap();

        let item = store.get_item(1).unwrap().unwrap();
        assert_eq!(item.name, "Gold Coin");
        assert_eq!(store.base_currency_type_id().unwrap(), Some(1));
    }
}
