use super::{require_scope, settings, ApiError, ApiResult, AppState};
use crate::cloud::{downlink, uplink};
use crate::database::{CloudPrice, PriceHistoryRow, TypeId};
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

const CLOUD_ENABLED: &str = "cloud_enabled";

fn cloud_enabled(state: &AppState) -> ApiResult<bool> {
    settings::bool_setting(state, CLOUD_ENABLED, state.config.cloud.enabled)
}

#[derive(Serialize)]
pub struct CloudStatusResponse {
    enabled: bool,
    has_remote: bool,
    outbox_len: i64,
}

/// `cloud/status` — whether the worker is toggled on and whether the
/// required remote credentials are present (§4.8).
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<CloudStatusResponse>> {
    Ok(Json(CloudStatusResponse {
        enabled: cloud_enabled(&state)?,
        has_remote: state.config.cloud.has_remote(),
        outbox_len: state.store.outbox_len()?,
    }))
}

pub async fn enable(State(state): State<Arc<AppState>>) -> ApiResult<Json<bool>> {
    state.store.set_setting(CLOUD_ENABLED, "true")?;
    Ok(Json(true))
}

pub async fn disable(State(state): State<Arc<AppState>>) -> ApiResult<Json<bool>> {
    state.store.set_setting(CLOUD_ENABLED, "false")?;
    Ok(Json(false))
}

/// `cloud/sync` — runs one uplink and one downlink pass inline, outside
/// the regular periodic cadence, for a manual "sync now" action.
pub async fn sync_now(State(state): State<Arc<AppState>>) -> ApiResult<Json<()>> {
    if !state.config.cloud.has_remote() {
        return Err(ApiError::bad_request("cloud sync has no remote credentials configured"));
    }
    let scope = require_scope(&state.collector)?;
    let device_uuid = crate::cloud::load_or_create_device_uuid()?;
    let base_currency = state.store.base_currency_type_id()?;

    uplink::run_uplink_cycle(
        &state.store,
        &state.config.cloud.base_url,
        &state.config.cloud.anon_key,
        device_uuid,
        base_currency,
        state.config.cloud.request_timeout_secs,
    )
    .await?;

    let season = state.collector.current_season();
    downlink::run_downlink_cycle(
        &state.store,
        &state.config.cloud.base_url,
        &state.config.cloud.anon_key,
        Some(scope.as_str()),
        season.as_deref(),
        state.config.cloud.request_timeout_secs,
    )
    .await?;

    Ok(Json(()))
}

/// `cloud/prices/:type_id` — read-through cache of the last downlinked
/// cloud price for one item.
pub async fn get_cloud_price(
    State(state): State<Arc<AppState>>,
    Path(type_id): Path<TypeId>,
) -> ApiResult<Json<Option<CloudPrice>>> {
    Ok(Json(state.store.get_cloud_price(type_id)?))
}

const HISTORY_WINDOW_HOURS: i64 = 72;

/// `cloud/prices/:type_id/history` — recent per-hour price history.
pub async fn get_price_history(
    State(state): State<Arc<AppState>>,
    Path(type_id): Path<TypeId>,
) -> ApiResult<Json<Vec<PriceHistoryRow>>> {
    let since_hour_bucket = (Utc::now().timestamp() / 3600) - HISTORY_WINDOW_HOURS;
    Ok(Json(state.store.price_history(type_id, since_hour_bucket)?))
}
