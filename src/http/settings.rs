//! `settings` (§6): whitelisted read/write over the Store's typed
//! key/value settings table. Three keys back Valuation toggles the rest
//! of the HTTP boundary reads on every request; the remainder round-trip
//! opaquely for the overlay/dashboard's own preferences.

use super::{ApiError, ApiResult, AppState};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub const TRADE_TAX_ENABLED: &str = "trade_tax_enabled";
pub const MAP_COST_ENABLED: &str = "map_cost_enabled";
pub const REAL_TIME_TRACKING_ENABLED: &str = "real_time_tracking_enabled";
pub const LOG_DIRECTORY: &str = "log_directory";

/// Keys externally readable/writable through the `settings` resource. Any
/// key outside this list is rejected at the boundary (§3 "Settings").
const WHITELIST: &[&str] = &[
    TRADE_TAX_ENABLED,
    MAP_COST_ENABLED,
    REAL_TIME_TRACKING_ENABLED,
    LOG_DIRECTORY,
    "ui_theme",
    "ui_overlay_opacity",
    "ui_show_value_per_hour",
];

fn is_whitelisted(key: &str) -> bool {
    WHITELIST.contains(&key)
}

/// Reads a boolean setting, falling back to the Config-supplied default
/// when the Store has never had it written (first run).
pub fn bool_setting(state: &AppState, key: &str, default: bool) -> ApiResult<bool> {
    match state.store.get_setting(key)? {
        Some(value) => Ok(value == "true"),
        None => Ok(default),
    }
}

pub fn trade_tax_enabled(state: &AppState) -> ApiResult<bool> {
    bool_setting(state, TRADE_TAX_ENABLED, state.config.valuation.trade_tax_enabled)
}

pub fn map_cost_enabled(state: &AppState) -> ApiResult<bool> {
    bool_setting(state, MAP_COST_ENABLED, state.config.valuation.map_cost_enabled)
}

pub fn real_time_tracking_enabled(state: &AppState) -> ApiResult<bool> {
    bool_setting(
        state,
        REAL_TIME_TRACKING_ENABLED,
        state.config.valuation.real_time_tracking_enabled,
    )
}

#[derive(Serialize)]
pub struct SettingsResponse {
    values: HashMap<String, String>,
}

pub async fn get_all(State(state): State<Arc<AppState>>) -> ApiResult<Json<SettingsResponse>> {
    let mut values = HashMap::new();
    values.insert(TRADE_TAX_ENABLED.to_string(), trade_tax_enabled(&state)?.to_string());
    values.insert(MAP_COST_ENABLED.to_string(), map_cost_enabled(&state)?.to_string());
    values.insert(
        REAL_TIME_TRACKING_ENABLED.to_string(),
        real_time_tracking_enabled(&state)?.to_string(),
    );
    for key in WHITELIST {
        if let Some(value) = state.store.get_setting(key)? {
            values.insert(key.to_string(), value);
        }
    }
    Ok(Json(SettingsResponse { values }))
}

#[derive(Deserialize)]
pub struct PutSettingQuery {
    key: String,
}

#[derive(Deserialize)]
pub struct PutSettingBody {
    value: String,
}

pub async fn put_one(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PutSettingQuery>,
    Json(body): Json<PutSettingBody>,
) -> ApiResult<Json<SettingsResponse>> {
    if !is_whitelisted(&query.key) {
        return Err(ApiError::bad_request(format!("setting '{}' is not externally writable", query.key)));
    }
    state.store.set_setting(&query.key, &body.value)?;
    get_all(State(state)).await
}
