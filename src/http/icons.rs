use super::{ApiError, ApiResult, AppState};
use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crate::database::TypeId;
use std::sync::Arc;

/// `icons/:type_id` — proxy contract only: redirects to the upstream icon
/// URL for the item's `icon_ref`. No on-disk cache; that layer is out of
/// scope here.
pub async fn proxy(State(state): State<Arc<AppState>>, Path(type_id): Path<TypeId>) -> ApiResult<Response> {
    let item = state
        .store
        .get_item(type_id)?
        .ok_or_else(|| ApiError::not_found(format!("item '{type_id}' not found")))?;
    let icon_ref = item
        .icon_ref
        .ok_or_else(|| ApiError::not_found(format!("item '{type_id}' has no icon")))?;
    Ok((StatusCode::FOUND, [(LOCATION, icon_ref)]).into_response())
}
