//! `runs/reset` (§6, §8 "Reset" boundary behavior): destroys Runs and
//! Deltas for a scope while preserving everything else — Items, Prices,
//! Settings, and the cloud Outbox all survive a reset untouched.

use crate::database::Store;
use crate::errors::EngineResult;
use crate::logger::{self, LogTag};

pub fn reset_scope(store: &Store, scope: &str) -> EngineResult<()> {
    store.reset_runs_and_deltas(scope)?;
    logger::info(LogTag::Store, &format!("reset runs and deltas for scope '{scope}'"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Run;
    use chrono::Utc;

    #[test]
    fn reset_scope_clears_runs_but_keeps_items() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_run(&Run {
                id: "run-1".to_string(),
                scope: "scope-a".to_string(),
                start_ts: Utc::now(),
                end_ts: None,
                zone_signature: "z1".to_string(),
                level_id: 1,
                level_type: "map".to_string(),
                level_uid: "uid-1".to_string(),
                is_hub_zone: false,
                is_sub_zone: false,
                parent_run_id: None,
                consolidated_children: vec![],
            })
            .unwrap();
        assert!(store.open_run("scope-a").unwrap().is_some());

        reset_scope(&store, "scope-a").unwrap();

        assert!(store.open_run("scope-a").unwrap().is_none());
    }
}
