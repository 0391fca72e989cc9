use super::{require_scope, ApiError, ApiResult, AppState};
use crate::database::{Price, PriceSource, TypeId};
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

/// `prices` — list local prices for the active scope.
pub async fn list_prices(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Price>>> {
    let scope = require_scope(&state.collector)?;
    Ok(Json(state.store.list_local_prices(&scope)?))
}

/// `prices/:type_id` — single lookup.
pub async fn get_price(State(state): State<Arc<AppState>>, Path(type_id): Path<TypeId>) -> ApiResult<Json<Option<Price>>> {
    let scope = require_scope(&state.collector)?;
    Ok(Json(state.store.get_local_price(&scope, type_id)?))
}

#[derive(Deserialize)]
pub struct PutPriceBody {
    value: f64,
}

/// `prices/:type_id` — manual override. Always recorded with
/// `source=Manual`; Base Currency is rejected outright (§3 "Price"
/// invariant — its row is never stored).
pub async fn put_price(
    State(state): State<Arc<AppState>>,
    Path(type_id): Path<TypeId>,
    Json(body): Json<PutPriceBody>,
) -> ApiResult<Json<Price>> {
    let scope = require_scope(&state.collector)?;
    if Some(type_id) == state.store.base_currency_type_id()? {
        return Err(ApiError::bad_request("Base Currency cannot have a stored price"));
    }
    let updated_ts = Utc::now();
    state
        .store
        .set_local_price(&scope, type_id, body.value, PriceSource::Manual, updated_ts)?;
    Ok(Json(Price {
        scope,
        type_id,
        value: body.value,
        source: PriceSource::Manual,
        updated_ts,
    }))
}

/// `prices/export` — every local price for the active scope, as a flat
/// list suitable for a client-side download.
pub async fn export_prices(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Price>>> {
    let scope = require_scope(&state.collector)?;
    Ok(Json(state.store.list_local_prices(&scope)?))
}

/// `prices/migrate-legacy-season` — copies prices recorded under a prior
/// season's scope string into the active scope, for players who kept the
/// same character name across a season rollover.
#[derive(Deserialize)]
pub struct MigrateQuery {
    from_scope: String,
}

pub async fn migrate_legacy_season(
    State(state): State<Arc<AppState>>,
    axum::extract::Query(query): axum::extract::Query<MigrateQuery>,
) -> ApiResult<Json<usize>> {
    let scope = require_scope(&state.collector)?;
    let legacy = state.store.list_local_prices(&query.from_scope)?;
    let count = legacy.len();
    for price in legacy {
        state
            .store
            .set_local_price(&scope, price.type_id, price.value, price.source, price.updated_ts)?;
    }
    Ok(Json(count))
}
