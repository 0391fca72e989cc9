//! Collector (H): the single ingest task wiring Tailer output through the
//! Line/Exchange parsers, Delta Engine, Run Segmenter, and Player Context,
//! committing every result to the Store (§4.6, §5). Logically
//! single-threaded: one line is fully resolved — parsed, diffed,
//! segmented, tagged, persisted — before the next is read.

use crate::config::TailerConfig;
use crate::database::{ContextTag, Run, SlotKey, Store, TypeId};
use crate::delta::{self, BagEvent};
use crate::errors::EngineResult;
use crate::logger::{self, LogTag};
use crate::parser::{parse_line, ExchangeParser, LineEvent, PriceLearned};
use crate::player::{PlayerContext, ScopeChange};
use crate::segmenter::{SegmentAction, Segmenter};
use crate::tailer::Tailer;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;
use tokio::time::interval;

/// Shared read handles the HTTP boundary and CLI use to observe the
/// Collector's state without taking it out of its owning task (§9 "Global
/// mutable state" — isolated behind explicit handles, not ambient).
#[derive(Clone)]
pub struct CollectorHandle {
    pub scope: Arc<RwLock<Option<String>>>,
    /// The bare SeasonId backing the current scope, tracked separately
    /// because a PlayerId-derived scope carries no recoverable SeasonId —
    /// splitting the scope string is lossy and wrong in that case.
    pub season: Arc<RwLock<Option<String>>>,
    pub paused: Arc<AtomicBool>,
    pub log_missing: Arc<AtomicBool>,
}

impl CollectorHandle {
    pub fn current_scope(&self) -> Option<String> {
        self.scope.read().unwrap().clone()
    }

    pub fn current_season(&self) -> Option<String> {
        self.season.read().unwrap().clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn is_log_missing(&self) -> bool {
        self.log_missing.load(Ordering::Relaxed)
    }
}

/// Cap on lines processed per tick-chunk (spec.md §4.1 "yields after a
/// bounded number of lines per tick to allow cancellation"). `run()` yields
/// to the scheduler between chunks so a deep backlog can't starve shutdown.
const LINES_PER_CHUNK: usize = 200;

pub struct Collector {
    store: Arc<Store>,
    tailer: Tailer,
    exchange_parser: ExchangeParser,
    segmenter: Segmenter,
    player: PlayerContext,
    current_context: Option<ContextTag>,
    base_currency_type_id: Option<TypeId>,
    poll_interval: std::time::Duration,
    handle: CollectorHandle,
}

impl Collector {
    /// Build a Collector, resuming the tailer from its persisted offset and
    /// performing the bounded cold-start scan to pre-seed the Player
    /// Context before the write path goes live (§4.6).
    pub fn new(store: Arc<Store>, config: &TailerConfig) -> EngineResult<Self> {
        let base_currency_type_id = store.base_currency_type_id()?;
        let tailer = Tailer::new(PathBuf::from(&config.log_path), &store)?;

        let mut player = PlayerContext::new();
        for line in tailer.cold_start_scan(config.cold_start_scan_bytes)? {
            if let Some(LineEvent::PlayerField { key, value }) = parse_line(&line) {
                player.observe_field(&key, &value);
            }
        }

        let scope = Arc::new(RwLock::new(player.current_scope().map(|s| s.to_string())));
        let season = Arc::new(RwLock::new(player.season_id().map(|s| s.to_string())));
        let handle = CollectorHandle {
            scope,
            season,
            paused: Arc::new(AtomicBool::new(false)),
            log_missing: Arc::new(AtomicBool::new(false)),
        };

        Ok(Self {
            store,
            tailer,
            exchange_parser: ExchangeParser::new(base_currency_type_id),
            segmenter: Segmenter::new(),
            player,
            current_context: None,
            base_currency_type_id,
            poll_interval: std::time::Duration::from_millis(config.poll_interval_ms),
            handle,
        })
    }

    pub fn handle(&self) -> CollectorHandle {
        self.handle.clone()
    }

    /// Long-lived ingest loop. Stops cooperatively on `shutdown`, persisting
    /// the tailer offset before returning.
    pub async fn run(mut self, shutdown: Arc<Notify>) {
        crate::startup::mark_service_start("collector");
        let mut ticker = interval(self.poll_interval);
        crate::startup::mark_service_ready("collector");

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    logger::info(LogTag::Collector, "collector stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.process_tick_cancellable(&shutdown).await {
                        logger::error(LogTag::Collector, &format!("ingest tick failed: {e}"));
                        crate::startup::set_service_message("collector", e.to_string());
                    } else {
                        crate::startup::clear_service_message("collector");
                    }
                }
            }
        }

        if let Err(e) = self.tailer.persist_offset(&self.store) {
            logger::error(LogTag::Collector, &format!("failed to persist tailer offset on shutdown: {e}"));
        }
    }

    /// Poll the tailer for one bounded chunk of lines and process it,
    /// persisting the tailer offset afterward. Returns whether the tailer's
    /// backlog is now fully drained (chunk came back under the cap).
    fn process_chunk(&mut self) -> EngineResult<bool> {
        let tick = self.tailer.poll_bounded(LINES_PER_CHUNK)?;
        self.handle.log_missing.store(!tick.source_available, Ordering::Relaxed);

        let now = Utc::now();
        if let Some(learned) = self.exchange_parser.check_timeout(now) {
            self.record_price_learned(learned, now)?;
        }

        let drained = tick.lines.len() < LINES_PER_CHUNK;
        for line in &tick.lines {
            self.process_line(line, now)?;
        }

        self.tailer.persist_offset(&self.store)?;
        Ok(drained)
    }

    /// Poll the tailer and process every complete line it returned,
    /// draining the backlog across as many bounded chunks as needed.
    /// Exposed so integration tests can drive a synthetic log
    /// deterministically rather than through the real polling cadence.
    pub fn process_tick(&mut self) -> EngineResult<()> {
        while !self.process_chunk()? {}
        Ok(())
    }

    /// Same backlog-draining loop as `process_tick`, but yields to the
    /// scheduler between chunks and bails out early on `shutdown` so a deep
    /// backlog can't block cancellation for an unbounded synchronous pass.
    async fn process_tick_cancellable(&mut self, shutdown: &Notify) -> EngineResult<()> {
        loop {
            if self.process_chunk()? {
                return Ok(());
            }
            tokio::select! {
                _ = shutdown.notified() => return Ok(()),
                _ = tokio::task::yield_now() => {}
            }
        }
    }

    fn process_line(&mut self, line: &str, now: DateTime<Utc>) -> EngineResult<()> {
        let Some(event) = parse_line(line) else {
            logger::verbose(LogTag::Parser, &format!("unrecognized line: {line}"));
            return Ok(());
        };

        match event {
            LineEvent::PlayerField { key, value } => {
                if let Some(change) = self.player.observe_field(&key, &value) {
                    self.apply_scope_change(change, now)?;
                }
            }
            LineEvent::ContextBegin(tag) => self.current_context = Some(tag),
            LineEvent::ContextEnd(_) => self.current_context = None,
            LineEvent::LevelEnter {
                level_uid,
                level_type,
                level_id,
                level_path,
            } => self.handle_level_enter(&level_uid, &level_type, level_id, &level_path, now)?,
            LineEvent::LevelOpen => {}
            LineEvent::BagModify {
                page_id,
                slot_id,
                type_id,
                quantity,
            } => self.apply_bag_event(
                BagEvent::Modify {
                    slot: SlotKey { page_id, slot_id },
                    type_id,
                    quantity,
                },
                now,
            )?,
            LineEvent::BagInit {
                page_id,
                slot_id,
                type_id,
                quantity,
            } => self.apply_bag_event(
                BagEvent::Init {
                    slot: SlotKey { page_id, slot_id },
                    type_id,
                    quantity,
                },
                now,
            )?,
            LineEvent::BagRemove { page_id, slot_id } => self.apply_bag_event(
                BagEvent::Remove {
                    slot: SlotKey { page_id, slot_id },
                },
                now,
            )?,
            LineEvent::ExchangeFragment(fragment) => {
                if let Some(learned) = self.exchange_parser.observe(fragment, now) {
                    self.record_price_learned(learned, now)?;
                }
            }
        }
        Ok(())
    }

    /// Bag events are dropped, not buffered, until a PlayerScope is known —
    /// writes must be scoped, and the cold-start scan already guarantees a
    /// scope is resolved before live tailing reaches real inventory lines
    /// in the common case.
    fn apply_bag_event(&mut self, event: BagEvent, now: DateTime<Utc>) -> EngineResult<()> {
        if self.handle.is_paused() {
            return Ok(());
        }
        let Some(scope) = self.player.current_scope().map(|s| s.to_string()) else {
            return Ok(());
        };

        let slot = match &event {
            BagEvent::Init { slot, .. } | BagEvent::Modify { slot, .. } | BagEvent::Remove { slot } => *slot,
        };
        let current = self.store.get_slot(&scope, slot)?;
        let outcome = delta::apply(current, &event);

        match outcome.new_state {
            Some(occupant) => self.store.put_slot(&scope, slot, occupant.type_id, occupant.quantity)?,
            None => self.store.clear_slot(&scope, slot)?,
        }

        let run_id = self.segmenter.active_run_id().map(|id| id.to_string());
        let tag = self.current_context.unwrap_or(ContextTag::Other);
        for raw in outcome.deltas {
            self.store.insert_delta(
                &scope,
                run_id.as_deref(),
                slot.page_id,
                slot.slot_id,
                raw.type_id,
                raw.signed_quantity,
                tag,
                now,
            )?;
        }
        Ok(())
    }

    fn handle_level_enter(
        &mut self,
        level_uid: &str,
        level_type: &str,
        level_id: i64,
        level_path: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let Some(scope) = self.player.current_scope().map(|s| s.to_string()) else {
            return Ok(());
        };
        let actions = self
            .segmenter
            .on_level_enter(level_uid, level_type, level_id, level_path, now, || {
                uuid::Uuid::new_v4().to_string()
            });

        for action in actions {
            match action {
                SegmentAction::OpenRun(new_run) => {
                    let run = Run {
                        id: new_run.run_id,
                        scope: scope.clone(),
                        start_ts: new_run.start_ts,
                        end_ts: None,
                        zone_signature: new_run.zone_signature,
                        level_id: new_run.level_id,
                        level_type: new_run.level_type,
                        level_uid: new_run.level_uid,
                        is_hub_zone: new_run.is_hub_zone,
                        is_sub_zone: new_run.is_sub_zone,
                        parent_run_id: new_run.parent_run_id,
                        consolidated_children: Vec::new(),
                    };
                    self.store.insert_run(&run)?;
                }
                SegmentAction::CloseRun { run_id, end_ts } => {
                    self.store.close_run(&run_id, end_ts)?;
                }
                SegmentAction::SpliceSubRun {
                    sub_run_id,
                    outer_run_id,
                    end_ts,
                } => {
                    self.store.close_run(&sub_run_id, end_ts)?;
                    self.store.consolidate_child_run(&outer_run_id, &sub_run_id)?;
                    self.store.repoint_deltas_to_parent(&sub_run_id, &outer_run_id)?;
                }
            }
        }
        Ok(())
    }

    fn record_price_learned(&self, learned: PriceLearned, now: DateTime<Utc>) -> EngineResult<()> {
        let Some(scope) = self.player.current_scope() else {
            return Ok(());
        };
        self.store.set_local_price(
            scope,
            learned.type_id,
            learned.reference_price,
            crate::database::PriceSource::ExchangeLearned,
            now,
        )?;
        if Some(learned.type_id) != self.base_currency_type_id {
            self.store.enqueue_outbox(learned.type_id, learned.reference_price, now)?;
        }
        Ok(())
    }

    /// Atomic scope-change sequence (§4.6): flush the open run under the
    /// prior scope, reset the segmenter, and publish the new scope. Slot
    /// State itself needs no explicit (re)load — every Store accessor
    /// already takes scope as a parameter, so there is no stale cache to
    /// invalidate. The Cloud Sync Worker re-derives its season partition
    /// from the Player Context on its own cadence rather than needing an
    /// explicit notification.
    fn apply_scope_change(&mut self, change: ScopeChange, now: DateTime<Utc>) -> EngineResult<()> {
        if let Some(previous_scope) = &change.previous {
            if let Some(open_run) = self.store.open_run(previous_scope)? {
                self.store.close_run(&open_run.id, now)?;
            }
        }
        self.segmenter.reset();
        *self.handle.scope.write().unwrap() = Some(change.new_scope.clone());
        *self.handle.season.write().unwrap() = self.player.season_id().map(|s| s.to_string());
        logger::info(LogTag::Collector, &format!("player scope changed to {}", change.new_scope));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Item;

    fn write_log(dir: &std::path::Path, contents: &str) -> PathBuf {
        let path = dir.join("game.log");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn config_for(path: &std::path::Path) -> TailerConfig {
        let mut cfg = TailerConfig::default();
        cfg.log_path = path.to_string_lossy().to_string();
        cfg.poll_interval_ms = 50;
        cfg
    }

    #[test]
    fn pickup_after_scope_resolves_inserts_a_delta() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            dir.path(),
            "[PLAYER] SeasonId=5\n[PLAYER] Name=Foo\n[LEVEL] ENTER uid=u1 type=map id=212 path=forest\n\
             [CTX] BEGIN PickItems\n[BAG] MODIFY page=102 slot=0 type=100300 num=31\n[CTX] END PickItems\n",
        );
        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .upsert_item(&Item {
                type_id: 1,
                name: "Base".to_string(),
                icon_ref: None,
                is_base_currency: true,
            })
            .unwrap();

        let mut collector = Collector::new(store.clone(), &config_for(&log)).unwrap();
        collector.process_tick().unwrap();

        let scope = collector.handle().current_scope().unwrap();
        assert_eq!(scope, "5_Foo");
        let run = store.open_run(&scope).unwrap().unwrap();
        let deltas = store.deltas_for_run(&run.id).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].signed_quantity, 31);
        assert_eq!(deltas[0].context_tag, ContextTag::PickItems);
    }

    #[test]
    fn bag_events_before_scope_is_known_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(dir.path(), "[BAG] MODIFY page=102 slot=0 type=5 num=3\n");
        let store = Arc::new(Store::open_in_memory().unwrap());
        let mut collector = Collector::new(store.clone(), &config_for(&log)).unwrap();
        collector.process_tick().unwrap();
        assert!(collector.handle().current_scope().is_none());
    }

    #[test]
    fn paused_collector_does_not_write_deltas() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            dir.path(),
            "[PLAYER] SeasonId=5\n[PLAYER] Name=Foo\n[BAG] MODIFY page=102 slot=0 type=5 num=3\n",
        );
        let store = Arc::new(Store::open_in_memory().unwrap());
        let mut collector = Collector::new(store.clone(), &config_for(&log)).unwrap();
        collector.handle().set_paused(true);
        collector.process_tick().unwrap();

        let scope = collector.handle().current_scope().unwrap();
        assert!(store.get_slot(&scope, SlotKey { page_id: 102, slot_id: 0 }).unwrap().is_none());
    }

    #[test]
    fn scope_change_closes_the_prior_open_run() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            dir.path(),
            "[PLAYER] SeasonId=5\n[PLAYER] Name=Foo\n[LEVEL] ENTER uid=u1 type=map id=212 path=forest\n\
             [PLAYER] Name=Bar\n",
        );
        let store = Arc::new(Store::open_in_memory().unwrap());
        let mut collector = Collector::new(store.clone(), &config_for(&log)).unwrap();
        collector.process_tick().unwrap();

        let old_scope_open_run = store.open_run("5_Foo").unwrap();
        assert!(old_scope_open_run.is_none());
        assert_eq!(collector.handle().current_scope().unwrap(), "5_Bar");
    }
}
