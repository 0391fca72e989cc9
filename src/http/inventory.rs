use super::{require_scope, settings, ApiResult, AppState};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct InventoryQuery {
    #[serde(default)]
    sort: SortBy,
}

#[derive(Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Quantity,
    Value,
}

#[derive(Serialize)]
pub struct InventoryRow {
    page_id: i64,
    slot_id: i64,
    type_id: crate::database::TypeId,
    quantity: i64,
    item_name: Option<String>,
    effective_price: Option<f64>,
    total_value: Option<f64>,
}

/// `inventory` — current Slot State, sortable by quantity or value (§6).
pub async fn list_inventory(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InventoryQuery>,
) -> ApiResult<Json<Vec<InventoryRow>>> {
    let scope = require_scope(&state.collector)?;
    let tax_enabled = settings::trade_tax_enabled(&state)?;
    let rows = state.store.load_slot_state(&scope)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let item = state.store.get_item(row.type_id)?;
        let price = state.valuation.effective_price(&scope, row.type_id, tax_enabled)?;
        out.push(InventoryRow {
            page_id: row.page_id,
            slot_id: row.slot_id,
            type_id: row.type_id,
            quantity: row.quantity,
            item_name: item.map(|i| i.name),
            effective_price: price,
            total_value: price.map(|p| p * row.quantity as f64),
        });
    }

    match query.sort {
        SortBy::Quantity => out.sort_by(|a, b| b.quantity.cmp(&a.quantity)),
        SortBy::Value => out.sort_by(|a, b| {
            b.total_value
                .unwrap_or(0.0)
                .partial_cmp(&a.total_value.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
    }

    Ok(Json(out))
}
