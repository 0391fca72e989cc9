use super::{require_scope, settings, ApiError, ApiResult, AppState};
use crate::database::Run;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    50
}

#[derive(Serialize)]
pub struct RunView {
    #[serde(flatten)]
    run: Run,
    duration_seconds: i64,
    gross: f64,
    net: f64,
    map_cost: f64,
    has_unpriced: bool,
}

fn view_for(
    state: &AppState,
    scope: &str,
    run: Run,
    tax_enabled: bool,
    map_cost_enabled: bool,
) -> ApiResult<RunView> {
    let now = Utc::now();
    let duration_seconds = state.valuation.in_map_duration_seconds(&run, now)?;
    let value = state.valuation.run_value(scope, &run.id, tax_enabled, map_cost_enabled)?;
    Ok(RunView {
        duration_seconds,
        gross: value.gross,
        net: value.net,
        map_cost: value.map_cost,
        has_unpriced: value.has_unpriced,
        run,
    })
}

/// `runs` — paginated list (§6).
pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<RunView>>> {
    let scope = require_scope(&state.collector)?;
    let tax_enabled = settings::trade_tax_enabled(&state)?;
    let map_cost_enabled = settings::map_cost_enabled(&state)?;
    let runs = state.store.list_runs(&scope, query.limit, query.offset)?;
    let views = runs
        .into_iter()
        .map(|r| view_for(&state, &scope, r, tax_enabled, map_cost_enabled))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(views))
}

/// `runs/:id` — single lookup.
pub async fn get_run(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<RunView>> {
    let scope = require_scope(&state.collector)?;
    let tax_enabled = settings::trade_tax_enabled(&state)?;
    let map_cost_enabled = settings::map_cost_enabled(&state)?;
    let run = state
        .store
        .get_run(&id)?
        .ok_or_else(|| ApiError::not_found(format!("run '{id}' not found")))?;
    Ok(Json(view_for(&state, &scope, run, tax_enabled, map_cost_enabled)?))
}

/// `runs/open` — the scope's currently open run, if any.
pub async fn open_run(State(state): State<Arc<AppState>>) -> ApiResult<Json<Option<RunView>>> {
    let scope = require_scope(&state.collector)?;
    let tax_enabled = settings::trade_tax_enabled(&state)?;
    let map_cost_enabled = settings::map_cost_enabled(&state)?;
    match state.store.open_run(&scope)? {
        Some(run) => Ok(Json(Some(view_for(&state, &scope, run, tax_enabled, map_cost_enabled)?))),
        None => Ok(Json(None)),
    }
}

#[derive(Serialize)]
pub struct SummaryResponse {
    run_count: u32,
    total_gross: f64,
    total_net: f64,
    value_per_hour: f64,
    avg_per_run: f64,
}

/// `runs/summary` — cumulative aggregates across the scope's recent runs.
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<SummaryResponse>> {
    let scope = require_scope(&state.collector)?;
    let tax_enabled = settings::trade_tax_enabled(&state)?;
    let map_cost_enabled = settings::map_cost_enabled(&state)?;
    let runs = state.store.list_runs(&scope, query.limit.max(1000), query.offset)?;

    let mut total_gross = 0.0;
    let mut total_net = 0.0;
    for run in &runs {
        let value = state.valuation.run_value(&scope, &run.id, tax_enabled, map_cost_enabled)?;
        total_gross += value.gross;
        total_net += value.net;
    }
    let value_per_hour = state
        .valuation
        .value_per_hour(&scope, &runs, tax_enabled, map_cost_enabled, Utc::now())?;
    let avg_per_run = state.valuation.avg_per_run(&scope, &runs, tax_enabled, map_cost_enabled)?;

    Ok(Json(SummaryResponse {
        run_count: runs.len() as u32,
        total_gross,
        total_net,
        value_per_hour,
        avg_per_run,
    }))
}

#[derive(Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    format: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

/// `runs/report` — cumulative report, JSON by default or CSV via
/// `?format=csv` (§6).
pub async fn report(State(state): State<Arc<AppState>>, Query(query): Query<ReportQuery>) -> ApiResult<Response> {
    let scope = require_scope(&state.collector)?;
    let tax_enabled = settings::trade_tax_enabled(&state)?;
    let map_cost_enabled = settings::map_cost_enabled(&state)?;
    let runs = state.store.list_runs(&scope, query.limit, query.offset)?;
    let views = runs
        .into_iter()
        .map(|r| view_for(&state, &scope, r, tax_enabled, map_cost_enabled))
        .collect::<ApiResult<Vec<_>>>()?;

    if query.format.as_deref() == Some("csv") {
        let mut writer = csv::Writer::from_writer(vec![]);
        for view in &views {
            writer
                .write_record(&[
                    view.run.id.clone(),
                    view.run.zone_signature.clone(),
                    view.run.start_ts.to_rfc3339(),
                    view.run.end_ts.map(|t| t.to_rfc3339()).unwrap_or_default(),
                    view.duration_seconds.to_string(),
                    view.gross.to_string(),
                    view.net.to_string(),
                ])
                .map_err(|e| ApiError::bad_request(format!("csv encode failed: {e}")))?;
        }
        let body = writer
            .into_inner()
            .map_err(|e| ApiError::bad_request(format!("csv encode failed: {e}")))?;
        Ok((
            [(axum::http::header::CONTENT_TYPE, "text/csv")],
            body,
        )
            .into_response())
    } else {
        Ok(Json(views).into_response())
    }
}

#[derive(Deserialize)]
pub struct PauseBody {
    paused: bool,
}

/// `runs` pause toggle.
pub async fn toggle_pause(State(state): State<Arc<AppState>>, Json(body): Json<PauseBody>) -> Json<bool> {
    state.collector.set_paused(body.paused);
    Json(body.paused)
}

/// `runs` reset — destroys runs and deltas for the active scope; prices,
/// items, and settings survive (§6, §8 "Reset" boundary behavior).
pub async fn reset(State(state): State<Arc<AppState>>) -> ApiResult<Json<()>> {
    let scope = require_scope(&state.collector)?;
    crate::reset::reset_scope(&state.store, &scope)?;
    Ok(Json(()))
}
