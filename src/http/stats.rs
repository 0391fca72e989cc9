use super::{require_scope, settings, ApiResult, AppState};
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    1000
}

#[derive(Serialize)]
pub struct HistoryBucket {
    date: String,
    run_count: u32,
    gross: f64,
    net: f64,
    cumulative_net: f64,
    value_per_hour: f64,
}

/// `stats/history` — the scope's runs bucketed by calendar day, with a
/// running cumulative net total and each day's own value/hour (§6).
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<HistoryBucket>>> {
    let scope = require_scope(&state.collector)?;
    let tax_enabled = settings::trade_tax_enabled(&state)?;
    let map_cost_enabled = settings::map_cost_enabled(&state)?;
    let now = Utc::now();
    let runs = state.store.list_runs(&scope, query.limit, 0)?;

    let mut by_day: BTreeMap<String, Vec<&crate::database::Run>> = BTreeMap::new();
    for run in &runs {
        by_day.entry(run.start_ts.date_naive().to_string()).or_default().push(run);
    }

    let mut cumulative_net = 0.0;
    let mut out = Vec::with_capacity(by_day.len());
    for (date, day_runs) in by_day {
        let owned: Vec<_> = day_runs.iter().map(|r| (*r).clone()).collect();
        let mut gross = 0.0;
        let mut net = 0.0;
        for run in &owned {
            let value = state.valuation.run_value(&scope, &run.id, tax_enabled, map_cost_enabled)?;
            gross += value.gross;
            net += value.net;
        }
        cumulative_net += net;
        let value_per_hour = state
            .valuation
            .value_per_hour(&scope, &owned, tax_enabled, map_cost_enabled, now)?;

        out.push(HistoryBucket {
            date,
            run_count: owned.len() as u32,
            gross,
            net,
            cumulative_net,
            value_per_hour,
        });
    }

    Ok(Json(out))
}
