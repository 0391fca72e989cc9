//! Valuation Engine (I): read-through service resolving an effective unit
//! price per item and aggregating run-level and session-level value
//! (§4.7). Strictly read-only against the Store.

use crate::database::{ContextTag, Run, Store, TypeId};
use crate::errors::EngineResult;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Fraction removed by the trade-tax toggle: effective price becomes
/// `price * (1 - 1/8)`.
const TRADE_TAX_FRACTION: f64 = 1.0 / 8.0;

pub struct RunValue {
    pub gross: f64,
    pub map_cost: f64,
    pub has_unpriced: bool,
    pub net: f64,
}

pub struct ValuationEngine {
    store: Arc<Store>,
}

impl ValuationEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn is_base_currency(&self, type_id: TypeId) -> EngineResult<bool> {
        Ok(self.store.base_currency_type_id()?.map_or(false, |id| id == type_id))
    }

    /// Effective price resolution before the trade-tax toggle (used for
    /// map-cost, which is never taxed).
    pub fn effective_price_no_tax(&self, scope: &str, type_id: TypeId) -> EngineResult<Option<f64>> {
        if self.is_base_currency(type_id)? {
            return Ok(Some(1.0));
        }
        let local = self.store.get_local_price(scope, type_id)?;
        let cloud = self.store.get_cloud_price(type_id)?;
        Ok(match (local, cloud) {
            (Some(l), Some(c)) => {
                if c.cloud_updated_ts >= l.updated_ts {
                    Some(c.median)
                } else {
                    Some(l.value)
                }
            }
            (Some(l), None) => Some(l.value),
            (None, Some(c)) => Some(c.median),
            (None, None) => None,
        })
    }

    /// Effective price resolution with the trade-tax toggle applied
    /// (§4.7 step 3). Base Currency is exempt.
    pub fn effective_price(&self, scope: &str, type_id: TypeId, tax_enabled: bool) -> EngineResult<Option<f64>> {
        if self.is_base_currency(type_id)? {
            return Ok(Some(1.0));
        }
        let price = self.effective_price_no_tax(scope, type_id)?;
        Ok(price.map(|v| {
            if tax_enabled {
                v * (1.0 - TRADE_TAX_FRACTION)
            } else {
                v
            }
        }))
    }

    /// gross/mapCost/net for one run (§4.7).
    pub fn run_value(
        &self,
        scope: &str,
        run_id: &str,
        tax_enabled: bool,
        map_cost_enabled: bool,
    ) -> EngineResult<RunValue> {
        let deltas = self.store.deltas_for_run(run_id)?;
        let mut gross = 0.0;
        let mut map_cost = 0.0;
        let mut has_unpriced = false;

        for delta in &deltas {
            match delta.context_tag {
                ContextTag::PickItems => {
                    let price = self.effective_price(scope, delta.type_id, tax_enabled)?;
                    gross += delta.signed_quantity as f64 * price.unwrap_or(0.0);
                }
                ContextTag::MapOpen => {
                    let price = self.effective_price_no_tax(scope, delta.type_id)?;
                    if price.is_none() && delta.signed_quantity != 0 {
                        has_unpriced = true;
                    }
                    map_cost += delta.signed_quantity.unsigned_abs() as f64 * price.unwrap_or(0.0);
                }
                _ => {}
            }
        }

        let net = gross - if map_cost_enabled { map_cost } else { 0.0 };
        Ok(RunValue {
            gross,
            map_cost,
            has_unpriced,
            net,
        })
    }

    /// `durationSeconds(run)`: closed runs use `endTs - startTs`; an open
    /// run uses `now - startTs`.
    pub fn duration_seconds(run: &Run, now: DateTime<Utc>) -> i64 {
        let end = run.end_ts.unwrap_or(now);
        (end - run.start_ts).num_seconds().max(0)
    }

    /// Duration excluding spliced sub-run intervals, for an outer run
    /// whose `consolidated_children` point at closed sub-runs.
    pub fn in_map_duration_seconds(&self, run: &Run, now: DateTime<Utc>) -> EngineResult<i64> {
        let mut total = Self::duration_seconds(run, now);
        for child_id in &run.consolidated_children {
            if let Some(child) = self.store.get_run(child_id)? {
                total -= Self::duration_seconds(&child, now);
            }
        }
        Ok(total.max(0))
    }

    /// `valuePerHour` over a set of runs, summing in-map durations by
    /// default (real-time mode is the caller's wall-clock alternative).
    pub fn value_per_hour(
        &self,
        scope: &str,
        runs: &[Run],
        tax_enabled: bool,
        map_cost_enabled: bool,
        now: DateTime<Utc>,
    ) -> EngineResult<f64> {
        let mut total_value = 0.0;
        let mut total_seconds = 0i64;
        for run in runs {
            let value = self.run_value(scope, &run.id, tax_enabled, map_cost_enabled)?;
            total_value += if map_cost_enabled { value.net } else { value.gross };
            total_seconds += self.in_map_duration_seconds(run, now)?;
        }
        if total_seconds == 0 {
            return Ok(0.0);
        }
        Ok(total_value / (total_seconds as f64 / 3600.0))
    }

    /// `avgPerRun`, using gross or net depending on the map-cost toggle.
    pub fn avg_per_run(
        &self,
        scope: &str,
        runs: &[Run],
        tax_enabled: bool,
        map_cost_enabled: bool,
    ) -> EngineResult<f64> {
        if runs.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for run in runs {
            let value = self.run_value(scope, &run.id, tax_enabled, map_cost_enabled)?;
            total += if map_cost_enabled { value.net } else { value.gross };
        }
        Ok(total / runs.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ContextTag, Item, Price, PriceSource, Run};
    use chrono::Duration;

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
    fn base_currency_is_always_one_and_untaxed() {
        let store = store_with_base_currency();
        let engine = ValuationEngine::new(store);
        assert_eq!(engine.effective_price("p1", 1, true).unwrap(), Some(1.0));
    }

    #[test]
    fn cloud_wins_on_tie_and_later_timestamp() {
        let store = store_with_base_currency();
        let t = Utc::now();
        store
            .set_local_price("p1", 9, 10.0, PriceSource::Manual, t)
            .unwrap();
        store
            .upsert_cloud_price(&crate::database::CloudPrice {
                type_id: 9,
                median: 20.0,
                p10: 18.0,
                p90: 22.0,
                contributor_count: 5,
                cloud_updated_ts: t,
            })
            .unwrap();
        let engine = ValuationEngine::new(store);
        // tie -> cloud wins
        assert_eq!(engine.effective_price_no_tax("p1", 9).unwrap(), Some(20.0));
    }

    #[test]
    fn scenario_6_cloud_first_then_fresher_local_override() {
        let store = store_with_base_currency();
        let t_l = Utc::now();
        let t_c = t_l + Duration::seconds(10);
        store
            .set_local_price("p1", 9, 5.0, PriceSource::Manual, t_l)
            .unwrap();
        store
            .upsert_cloud_price(&crate::database::CloudPrice {
                type_id: 9,
                median: 7.0,
                p10: 6.0,
                p90: 8.0,
                contributor_count: 5,
                cloud_updated_ts: t_c,
            })
            .unwrap();
        let engine = ValuationEngine::new(store.clone());
        assert_eq!(engine.effective_price_no_tax("p1", 9).unwrap(), Some(7.0));

        let t_l2 = t_c + Duration::seconds(10);
        store
            .set_local_price("p1", 9, 9.0, PriceSource::ExchangeLearned, t_l2)
            .unwrap();
        assert_eq!(engine.effective_price_no_tax("p1", 9).unwrap(), Some(9.0));
    }

    #[test]
    fn trade_tax_reduces_effective_price_by_one_eighth() {
        let store = store_with_base_currency();
        store
            .set_local_price("p1", 9, 8.0, PriceSource::Manual, Utc::now())
            .unwrap();
        let engine = ValuationEngine::new(store);
        assert_eq!(engine.effective_price("p1", 9, true).unwrap(), Some(7.0));
    }

    #[test]
    fn scenario_1_run_gross_matches_pickup_delta() {
        let store = store_with_base_currency();
        store
            .set_local_price("p1", 100300, 1.0, PriceSource::Manual, Utc::now())
            .unwrap();
        store
            .insert_delta(
                "p1",
                Some("run1"),
                102,
                0,
                100300,
                31,
                ContextTag::PickItems,
                Utc::now(),
            )
            .unwrap();
        let engine = ValuationEngine::new(store);
        let value = engine.run_value("p1", "run1", false, false).unwrap();
        assert_eq!(value.gross, 31.0);
    }

    #[test]
    fn unpriced_map_cost_items_flag_has_unpriced() {
        let store = store_with_base_currency();
        store
            .insert_delta("p1", Some("run1"), 1, 1, 555, -2, ContextTag::MapOpen, Utc::now())
            .unwrap();
        let engine = ValuationEngine::new(store);
        let value = engine.run_value("p1", "run1", false, true).unwrap();
        assert!(value.has_unpriced);
        assert_eq!(value.map_cost, 0.0);
    }

    #[test]
    fn duration_of_open_run_counts_to_now() {
        let start = Utc::now() - Duration::seconds(120);
        let run = Run {
            id: "r1".to_string(),
            scope: "p1".to_string(),
            start_ts: start,
            end_ts: None,
            zone_signature: "forest_1".to_string(),
            level_id: 1,
            level_type: "map".to_string(),
            level_uid: "u".to_string(),
            is_hub_zone: false,
            is_sub_zone: false,
            parent_run_id: None,
            consolidated_children: Vec::new(),
        };
        let now = start + Duration::seconds(120);
        assert_eq!(ValuationEngine::duration_seconds(&run, now), 120);
    }
}
