//! HTTP handlers for batch allocation endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{AllocationMismatch, BatchAllocation, BatchProgress, BatchTarget};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::batch_allocation::{BatchMovementInput, BatchTargetInput};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AllocationQuery {
    pub sku: String,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub requested: Decimal,
    pub removed: Decimal,
}

/// List every allocation document
pub async fn list_batch_allocations(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<BatchAllocation>>> {
    check_permission(&current_user.0, "batches", "read")?;
    Ok(Json(state.services.batches.list_all().await?))
}

/// Allocation map for one (sku, location)
pub async fn get_batch_allocation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<AllocationQuery>,
) -> AppResult<Json<BatchAllocation>> {
    check_permission(&current_user.0, "batches", "read")?;
    let doc = state
        .services
        .batches
        .get(&query.sku.trim().to_uppercase(), &query.location)
        .await?;
    Ok(Json(doc))
}

/// Credit a batch bucket
pub async fn add_to_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BatchMovementInput>,
) -> AppResult<Json<BatchAllocation>> {
    check_permission(&current_user.0, "batches", "write")?;
    let doc = state
        .services
        .batches
        .add(
            &input.sku.trim().to_uppercase(),
            &input.location,
            &input.batch_id,
            input.quantity,
        )
        .await?;
    Ok(Json(doc))
}

/// Debit a batch bucket, clamped at zero
pub async fn remove_from_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BatchMovementInput>,
) -> AppResult<Json<RemovedResponse>> {
    check_permission(&current_user.0, "batches", "write")?;
    let removed = state
        .services
        .batches
        .remove(
            &input.sku.trim().to_uppercase(),
            &input.location,
            &input.batch_id,
            input.quantity,
        )
        .await?;
    Ok(Json(RemovedResponse {
        requested: input.quantity,
        removed,
    }))
}

pub async fn list_batch_progress(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<BatchProgress>>> {
    check_permission(&current_user.0, "batches", "read")?;
    Ok(Json(state.services.batches.all_progress().await?))
}

pub async fn get_batch_progress(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<String>,
) -> AppResult<Json<BatchProgress>> {
    check_permission(&current_user.0, "batches", "read")?;
    Ok(Json(state.services.batches.progress(&batch_id).await?))
}

/// Set the expected quantity of a batch
pub async fn set_batch_target(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<String>,
    Json(input): Json<BatchTargetInput>,
) -> AppResult<Json<BatchTarget>> {
    check_permission(&current_user.0, "batches", "write")?;
    let target = state
        .services
        .batches
        .set_target(&batch_id, input.expected_quantity)
        .await?;
    Ok(Json(target))
}

/// Pairs allocated beyond their counted stock
pub async fn check_batch_consistency(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<AllocationMismatch>>> {
    check_permission(&current_user.0, "batches", "read")?;
    Ok(Json(state.services.batches.check_consistency().await?))
}
