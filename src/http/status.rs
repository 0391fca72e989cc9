use super::{ApiResult, AppState};
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct StatusResponse {
    collector_running: bool,
    waiting_for_player: bool,
    log_path_missing: bool,
    current_scope: Option<String>,
    paused: bool,
    store: crate::database::StoreStats,
    services: Vec<crate::startup::StartupServiceStatus>,
}

/// `status`: collector running, waiting-for-player, log-path-missing (§6).
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatusResponse>> {
    let current_scope = state.collector.current_scope();
    Ok(Json(StatusResponse {
        collector_running: crate::startup::get_status("collector").map_or(false, |s| s.ready),
        waiting_for_player: current_scope.is_none(),
        log_path_missing: state.collector.is_log_missing(),
        current_scope,
        paused: state.collector.is_paused(),
        store: state.store.stats()?,
        services: crate::startup::snapshot(),
    }))
}
