//! HTTP boundary (§6): a thin axum router over the engine's core. Handlers
//! only translate requests into Store/Valuation calls and shape the
//! response — no business logic lives here.

mod cloud;
mod icons;
mod inventory;
mod prices;
mod runs;
mod settings;
mod stats;
mod status;

use crate::collector::CollectorHandle;
use crate::config::Config;
use crate::database::Store;
use crate::errors::EngineError;
use crate::valuation::ValuationEngine;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state every handler reads through. Cheap to clone (everything
/// behind it is already `Arc`/a handle over shared state) — `Arc<AppState>`
/// is the type actually stored in the router.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub valuation: Arc<ValuationEngine>,
    pub collector: CollectorHandle,
    pub config: Config,
}

/// Stable machine-readable error envelope for every boundary failure (§7
/// propagation policy).
#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        let (status, code) = match &error {
            EngineError::SourceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "source_unavailable"),
            EngineError::StoreFatal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_fatal"),
            EngineError::StoreTransient(_) | EngineError::Database(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_transient")
            }
            EngineError::CloudRetryable(_) | EngineError::Http(_) => (StatusCode::BAD_GATEWAY, "cloud_retryable"),
            EngineError::CloudFatal(_) => (StatusCode::BAD_GATEWAY, "cloud_fatal"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        Self {
            status,
            code,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                code: self.code,
                message: self.message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Resolve the active PlayerScope or fail with a stable "no player" error —
/// every resource but `status`/`settings` is scoped to the currently
/// tracked character.
fn require_scope(collector: &CollectorHandle) -> ApiResult<String> {
    collector
        .current_scope()
        .ok_or_else(|| ApiError::bad_request("no player scope resolved yet"))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status::get_status))
        .route("/runs", get(runs::list_runs))
        .route("/runs/current", get(runs::open_run))
        .route("/runs/summary", get(runs::summary))
        .route("/runs/report", get(runs::report))
        .route("/runs/pause", post(runs::toggle_pause))
        .route("/runs/reset", post(runs::reset))
        .route("/runs/:id", get(runs::get_run))
        .route("/inventory", get(inventory::list_inventory))
        .route("/prices", get(prices::list_prices))
        .route("/prices/export", get(prices::export_prices))
        .route("/prices/migrate-legacy-season", post(prices::migrate_legacy_season))
        .route("/prices/:type_id", get(prices::get_price).put(prices::put_price))
        .route("/stats/history", get(stats::history))
        .route("/cloud/status", get(cloud::get_status))
        .route("/cloud/enable", post(cloud::enable))
        .route("/cloud/disable", post(cloud::disable))
        .route("/cloud/sync", post(cloud::sync_now))
        .route("/cloud/prices/:type_id", get(cloud::get_cloud_price))
        .route("/cloud/prices/:type_id/history", get(cloud::get_price_history))
        .route("/settings", get(settings::get_all).put(settings::put_one))
        .route("/icons/:type_id", get(icons::proxy))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(Arc::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Item;

    fn test_state() -> AppState {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .upsert_item(&Item {
                type_id: 1,
                name: "Base".to_string(),
                icon_ref: None,
                is_base_currency: true,
            })
            .unwrap();
        AppState {
            valuation: Arc::new(ValuationEngine::new(store.clone())),
            store,
            collector: CollectorHandle {
                scope: Arc::new(std::sync::RwLock::new(None)),
                season: Arc::new(std::sync::RwLock::new(None)),
                paused: Arc::new(std::sync::atomic::AtomicBool::new(false)),
                log_missing: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            },
            config: Config::default(),
        }
    }

    #[tokio::test]
    async fn router_builds_without_panicking() {
        let _router = build_router(test_state());
    }
}
