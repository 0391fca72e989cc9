//! End-to-end integration tests driving the Collector over a synthetic,
//! `tempfile`-backed game log, covering the concrete scenarios from the
//! Collector's contract (run segmentation, delta attribution, price
//! learning, sub-zone splicing, pause/scope semantics).

use lootwarden::collector::Collector;
use lootwarden::config::TailerConfig;
use lootwarden::database::{ContextTag, Item, Store};
use lootwarden::valuation::ValuationEngine;
use std::path::Path;
use std::sync::Arc;

fn write_log(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("game.log");
    std::fs::write(&path, contents).unwrap();
    path
}

fn config_for(path: &Path) -> TailerConfig {
    let mut cfg = TailerConfig::default();
    cfg.log_path = path.to_string_lossy().to_string();
    cfg.poll_interval_ms = 50;
    cfg
}

fn store_with_base_currency() -> Arc<Store> {
    let store = Arc::new(Store::open_in_memory().unwrap());
    store
        .upsert_item(&Item {
            type_id: 1,
            name: "Base".to_string(),
            icon_ref: None,
            is_base_currency: true,
        })
        .unwrap();
    store
}

#[test]
fn scenario_1_pickup_delta_is_attributed_to_the_open_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "[PLAYER] SeasonId=5\n[PLAYER] Name=Foo\n[LEVEL] ENTER uid=u1 type=map id=212 path=forest\n\
         [CTX] BEGIN PickItems\n[BAG] MODIFY page=102 slot=0 type=100300 num=31\n[CTX] END PickItems\n",
    );
    let store = store_with_base_currency();
    store
        .set_local_price("5_Foo", 100300, 1.0, lootwarden::database::PriceSource::Manual, chrono::Utc::now())
        .unwrap();

    let mut collector = Collector::new(store.clone(), &config_for(&log)).unwrap();
    collector.process_tick().unwrap();

    let scope = collector.handle().current_scope().unwrap();
    let run = store.open_run(&scope).unwrap().unwrap();
    let engine = ValuationEngine::new(store.clone());
    let value = engine.run_value(&scope, &run.id, false, false).unwrap();
    assert_eq!(value.gross, 31.0);
}

#[test]
fn scenario_2_stack_swap_and_removal_update_slot_state_and_deltas() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "[PLAYER] SeasonId=5\n[PLAYER] Name=Foo\n\
         [BAG] INIT page=102 slot=0 type=100300 num=10\n\
         [BAG] MODIFY page=102 slot=0 type=100300 num=20\n\
         [BAG] REMOVE page=102 slot=0\n",
    );
    let store = store_with_base_currency();
    let mut collector = Collector::new(store.clone(), &config_for(&log)).unwrap();
    collector.process_tick().unwrap();

    let scope = collector.handle().current_scope().unwrap();
    assert!(store
        .get_slot(&scope, lootwarden::database::SlotKey { page_id: 102, slot_id: 0 })
        .unwrap()
        .is_none());
}

#[test]
fn scenario_4_exchange_window_learns_a_price_on_explicit_end() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "[PLAYER] SeasonId=5\n[PLAYER] Name=Foo\n\
         [EXCHANGE] SEARCH type=9\n\
         [EXCHANGE] LISTING price=10.0 page=101\n\
         [EXCHANGE] LISTING price=12.0 page=101\n\
         [EXCHANGE] LISTING price=14.0 page=101\n\
         [EXCHANGE] END\n",
    );
    let store = store_with_base_currency();
    let mut collector = Collector::new(store.clone(), &config_for(&log)).unwrap();
    collector.process_tick().unwrap();

    let scope = collector.handle().current_scope().unwrap();
    let price = store.get_local_price(&scope, 9).unwrap().unwrap();
    assert_eq!(price.source, lootwarden::database::PriceSource::ExchangeLearned);
    assert!(store.outbox_len().unwrap() > 0);
}

#[test]
fn scenario_5_sub_zone_splice_reattaches_loot_to_the_outer_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "[PLAYER] SeasonId=5\n[PLAYER] Name=Foo\n\
         [LEVEL] ENTER uid=u1 type=map id=212 path=forest\n\
         [CTX] BEGIN PickItems\n[BAG] MODIFY page=102 slot=0 type=100300 num=10\n[CTX] END PickItems\n\
         [LEVEL] ENTER uid=u2 type=map id=900 path=nightmare\n\
         [CTX] BEGIN PickItems\n[BAG] MODIFY page=102 slot=1 type=100300 num=5\n[CTX] END PickItems\n\
         [LEVEL] ENTER uid=u1 type=map id=212 path=forest\n",
    );
    let store = store_with_base_currency();
    let mut collector = Collector::new(store.clone(), &config_for(&log)).unwrap();
    collector.process_tick().unwrap();

    let scope = collector.handle().current_scope().unwrap();
    let open_run = store.open_run(&scope).unwrap().unwrap();
    assert_eq!(open_run.consolidated_children.len(), 1);

    let deltas = store.deltas_for_run(&open_run.id).unwrap();
    let total: i64 = deltas.iter().map(|d| d.signed_quantity).sum();
    assert_eq!(total, 15, "sub-run's delta must repoint to the outer run on splice");
}

#[test]
fn paused_collector_drops_bag_events_but_still_tracks_scope_and_levels() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "[PLAYER] SeasonId=5\n[PLAYER] Name=Foo\n\
         [LEVEL] ENTER uid=u1 type=map id=212 path=forest\n\
         [CTX] BEGIN PickItems\n[BAG] MODIFY page=102 slot=0 type=100300 num=10\n[CTX] END PickItems\n",
    );
    let store = store_with_base_currency();
    let mut collector = Collector::new(store.clone(), &config_for(&log)).unwrap();
    collector.handle().set_paused(true);
    collector.process_tick().unwrap();

    let scope = collector.handle().current_scope().unwrap();
    let run = store.open_run(&scope).unwrap().unwrap();
    assert!(store.deltas_for_run(&run.id).unwrap().is_empty());
}

#[test]
fn a_backlog_larger_than_one_chunk_still_drains_in_a_single_process_tick_call() {
    let dir = tempfile::tempdir().unwrap();
    let mut contents = String::from("[PLAYER] SeasonId=5\n[PLAYER] Name=Foo\n[LEVEL] ENTER uid=u1 type=map id=212 path=forest\n[CTX] BEGIN PickItems\n");
    for i in 0..500 {
        contents.push_str(&format!("[BAG] MODIFY page=102 slot={i} type=100300 num=1\n"));
    }
    contents.push_str("[CTX] END PickItems\n");
    let log = write_log(dir.path(), &contents);

    let store = store_with_base_currency();
    let mut collector = Collector::new(store.clone(), &config_for(&log)).unwrap();
    collector.process_tick().unwrap();

    let scope = collector.handle().current_scope().unwrap();
    let run = store.open_run(&scope).unwrap().unwrap();
    let deltas = store.deltas_for_run(&run.id).unwrap();
    assert_eq!(deltas.len(), 500);
    assert!(deltas.iter().all(|d| d.context_tag == ContextTag::PickItems));
}
