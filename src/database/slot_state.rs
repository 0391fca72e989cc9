use super::connection::Store;
use super::models::{SlotKey, SlotOccupant, SlotStateRow, TypeId};
use crate::errors::{EngineError, EngineResult};
use rusqlite::params;

impl Store {
    /// Full snapshot of a scope's recorded slot occupancy, used when
    /// loading state after a scope change (§4.6).
    pub fn load_slot_state(&self, scope: &str) -> EngineResult<Vec<SlotStateRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT scope, page_id, slot_id, type_id, quantity FROM slot_state WHERE scope = ?1",
        )?;
        let rows = stmt
            .query_map(params![scope], |row| {
                Ok(SlotStateRow {
                    scope: row.get(0)?,
                    page_id: row.get(1)?,
                    slot_id: row.get(2)?,
                    type_id: row.get(3)?,
                    quantity: row.get(4)?,
                })
            })
            .map_err(EngineError::Database)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EngineError::Database)?);
        }
        Ok(out)
    }

    /// Current occupant of a single slot, or `None` if empty.
    pub fn get_slot(
        &self,
        scope: &str,
        key: SlotKey,
    ) -> EngineResult<Option<SlotOccupant>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT type_id, quantity FROM slot_state WHERE scope = ?1 AND page_id = ?2 AND slot_id = ?3",
            params![scope, key.page_id, key.slot_id],
            |row| {
                Ok(SlotOccupant {
                    type_id: row.get(0)?,
                    quantity: row.get(1)?,
                })
            },
        );
        match result {
            Ok(occupant) => Ok(Some(occupant)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(EngineError::Database(e)),
        }
    }

    /// Overwrite a slot with an absolute occupant (type, quantity).
    pub fn put_slot(
        &self,
        scope: &str,
        key: SlotKey,
        type_id: TypeId,
        quantity: i64,
    ) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO slot_state (scope, page_id, slot_id, type_id, quantity)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(scope, page_id, slot_id)
             DO UPDATE SET type_id = excluded.type_id, quantity = excluded.quantity",
            params![scope, key.page_id, key.slot_id, type_id, quantity],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }

    /// Clear a slot (the bag entry was removed entirely).
    pub fn clear_slot(&self, scope: &str, key: SlotKey) -> EngineResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM slot_state WHERE scope = ?1 AND page_id = ?2 AND slot_id = ?3",
            params![scope, key.page_id, key.slot_id],
        )
        .map_err(EngineError::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_clear_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let key = SlotKey {
            page_id: 0,
            slot_id: 3,
        };
        assert!(store.get_slot("p1", key).unwrap().is_none());

        store.put_slot("p1", key, 42, 5).unwrap();
        let occupant = store.get_slot("p1", key).unwrap().unwrap();
        assert_eq!(occupant.type_id, 42);
        assert_eq!(occupant.quantity, 5);

        store.clear_slot("p1", key).unwrap();
        assert!(store.get_slot("p1", key).unwrap().is_none());
    }

    #[test]
    fn scopes_are_isolated() {
        let store = Store::open_in_memory().unwrap();
        let key = SlotKey {
            page_id: 0,
            slot_id: 0,
        };
        store.put_slot("p1", key, 1, 1).unwrap();
        assert!(store.get_slot("p2", key).unwrap().is_none());
    }
}
