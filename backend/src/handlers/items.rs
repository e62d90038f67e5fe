//! HTTP handlers for item master endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use shared::ItemMaster;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::catalog::UpsertItemInput;
use crate::AppState;

pub async fn list_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ItemMaster>>> {
    check_permission(&current_user.0, "items", "read")?;
    Ok(Json(state.services.catalog.list_items().await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sku): Path<String>,
) -> AppResult<Json<ItemMaster>> {
    check_permission(&current_user.0, "items", "read")?;
    Ok(Json(
        state
            .services
            .catalog
            .get_item(&sku.trim().to_uppercase())
            .await?,
    ))
}

/// Create or replace an item master record
pub async fn upsert_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<UpsertItemInput>,
) -> AppResult<Json<ItemMaster>> {
    check_permission(&current_user.0, "items", "write")?;
    Ok(Json(state.services.catalog.upsert_item(input).await?))
}
