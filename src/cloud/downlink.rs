//! Downlink loop: fetches the aggregated price set for the current
//! season and recent per-hour price history for TypeIds present in the
//! current inventory, both paginated against the remote cap (§4.8).

use super::{http_client, paginate, REMOTE_PAGE_SIZE};
use crate::database::{CloudPrice, PriceHistoryRow, Store, TypeId};
use crate::errors::{EngineError, EngineResult};
use crate::logger::{self, LogTag};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;
use tokio::time::{interval, Duration};

const HISTORY_WINDOW_HOURS: i64 = 72;

#[derive(Deserialize)]
struct CloudPriceDto {
    type_id: TypeId,
    median: f64,
    p10: f64,
    p90: f64,
    contributor_count: u32,
    cloud_updated_ts: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PriceHistoryDto {
    type_id: TypeId,
    hour_bucket: i64,
    median: f64,
    p10: f64,
    p90: f64,
    submission_count: u32,
    unique_device_count: u32,
}

/// One pass: refresh the whole cloud price table for `season`, then
/// refresh history only for TypeIds the player is actually holding in
/// `scope` (the full PlayerScope, not the bare SeasonId — Slot State is
/// keyed by PlayerScope while the remote price set is keyed by SeasonId).
pub async fn run_downlink_cycle(
    store: &Store,
    base_url: &str,
    anon_key: &str,
    scope: Option<&str>,
    season: Option<&str>,
    request_timeout_secs: u64,
) -> EngineResult<()> {
    let (Some(scope), Some(season)) = (scope, season) else {
        logger::verbose(LogTag::Cloud, "downlink skipped: no season known yet");
        return Ok(());
    };
    let client = http_client(request_timeout_secs)?;

    let prices = fetch_cloud_prices(&client, base_url, anon_key, season).await?;
    for dto in prices {
        store.upsert_cloud_price(&CloudPrice {
            type_id: dto.type_id,
            median: dto.median,
            p10: dto.p10,
            p90: dto.p90,
            contributor_count: dto.contributor_count,
            cloud_updated_ts: dto.cloud_updated_ts,
        })?;
    }

    let since_hour_bucket = (Utc::now().timestamp() / 3600) - HISTORY_WINDOW_HOURS;
    for type_id in current_inventory_type_ids(store, scope)? {
        let history = fetch_price_history(&client, base_url, anon_key, type_id, since_hour_bucket).await?;
        for row in history {
            store.upsert_price_history(&PriceHistoryRow {
                type_id: row.type_id,
                hour_bucket: row.hour_bucket,
                median: row.median,
                p10: row.p10,
                p90: row.p90,
                submission_count: row.submission_count,
                unique_device_count: row.unique_device_count,
            })?;
        }
    }

    Ok(())
}

async fn fetch_cloud_prices(
    client: &reqwest::Client,
    base_url: &str,
    anon_key: &str,
    season: &str,
) -> EngineResult<Vec<CloudPriceDto>> {
    paginate(|page| async move {
        let response = client
            .get(format!("{base_url}/prices"))
            .bearer_auth(anon_key)
            .query(&[
                ("season", season),
                ("page", &page.to_string()),
                ("page_size", &REMOTE_PAGE_SIZE.to_string()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::CloudRetryable(e.to_string()))?;
        response
            .json::<Vec<CloudPriceDto>>()
            .await
            .map_err(|e| EngineError::CloudRetryable(e.to_string()))
    })
    .await
}

async fn fetch_price_history(
    client: &reqwest::Client,
    base_url: &str,
    anon_key: &str,
    type_id: TypeId,
    since_hour_bucket: i64,
) -> EngineResult<Vec<PriceHistoryDto>> {
    paginate(|page| async move {
        let response = client
            .get(format!("{base_url}/price-history"))
            .bearer_auth(anon_key)
            .query(&[
                ("type_id", type_id.to_string()),
                ("since_hour_bucket", since_hour_bucket.to_string()),
                ("page", page.to_string()),
                ("page_size", REMOTE_PAGE_SIZE.to_string()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::CloudRetryable(e.to_string()))?;
        response
            .json::<Vec<PriceHistoryDto>>()
            .await
            .map_err(|e| EngineError::CloudRetryable(e.to_string()))
    })
    .await
}

fn current_inventory_type_ids(store: &Store, scope: &str) -> EngineResult<Vec<TypeId>> {
    let rows = store.load_slot_state(scope)?;
    let mut ids: Vec<TypeId> = rows.iter().map(|r| r.type_id).collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Long-lived downlink task. Stops cooperatively on `shutdown`. Reads the
/// current season from the shared scope handle on every tick rather than
/// owning a copy, so a mid-flight scope change is picked up automatically.
pub async fn run(
    store: Arc<Store>,
    shutdown: Arc<Notify>,
    period_secs: u64,
    base_url: String,
    anon_key: String,
    scope: Arc<RwLock<Option<String>>>,
    season: Arc<RwLock<Option<String>>>,
    request_timeout_secs: u64,
) {
    logger::info(LogTag::Cloud, "downlink worker started");
    let mut ticker = interval(Duration::from_secs(period_secs));

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                logger::info(LogTag::Cloud, "downlink worker stopping");
                break;
            }
            _ = ticker.tick() => {
                let current_scope = scope.read().unwrap().clone();
                let current_season = season.read().unwrap().clone();
                if let Err(e) = run_downlink_cycle(
                    &store,
                    &base_url,
                    &anon_key,
                    current_scope.as_deref(),
                    current_season.as_deref(),
                    request_timeout_secs,
                ).await {
                    logger::error(LogTag::Cloud, &format!("downlink cycle failed: {e}"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_type_ids_are_deduped_and_sorted() {
        let store = Store::open_in_memory().unwrap();
        store
            .put_slot("5_Foo", crate::database::SlotKey { page_id: 900, slot_id: 0 }, 20, 1)
            .unwrap();
        store
            .put_slot("5_Foo", crate::database::SlotKey { page_id: 900, slot_id: 1 }, 10, 1)
            .unwrap();
        store
            .put_slot("5_Foo", crate::database::SlotKey { page_id: 900, slot_id: 2 }, 20, 1)
            .unwrap();

        let ids = current_inventory_type_ids(&store, "5_Foo").unwrap();
        assert_eq!(ids, vec![10, 20]);
    }

    #[tokio::test]
    async fn downlink_cycle_is_a_noop_without_a_known_season() {
        let store = Store::open_in_memory().unwrap();
        run_downlink_cycle(&store, "http://localhost:0", "key", None, None, 1)
            .await
            .unwrap();
    }
}
