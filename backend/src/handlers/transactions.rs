//! HTTP handlers for stock transaction endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Transaction, TransactionStatus};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::transaction::{
    ConfirmedTransaction, CreateTransactionInput, CreatedTransaction, RectifiedTransaction,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmInput {
    pub otp: String,
}

/// Create a pending transaction; the OTP is only in this response
pub async fn create_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransactionInput>,
) -> AppResult<(StatusCode, Json<CreatedTransaction>)> {
    check_permission(&current_user.0, "transactions", "create")?;
    let created = state
        .services
        .transactions
        .create(input, &current_user.0.username)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<TransactionListQuery>,
) -> AppResult<Json<Vec<Transaction>>> {
    check_permission(&current_user.0, "transactions", "read")?;
    Ok(Json(state.services.transactions.list(query.status).await?))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Transaction>> {
    check_permission(&current_user.0, "transactions", "read")?;
    Ok(Json(state.services.transactions.get(id).await?))
}

/// Confirm with OTP and apply the transfer effects
pub async fn confirm_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ConfirmInput>,
) -> AppResult<Json<ConfirmedTransaction>> {
    check_permission(&current_user.0, "transactions", "approve")?;
    let confirmed = state
        .services
        .transactions
        .confirm(id, input.otp.trim(), &current_user.0.username)
        .await?;
    Ok(Json(confirmed))
}

pub async fn reject_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Transaction>> {
    check_permission(&current_user.0, "transactions", "approve")?;
    let rejected = state
        .services
        .transactions
        .reject(id, &current_user.0.username)
        .await?;
    Ok(Json(rejected))
}

/// Reverse a completed transaction
pub async fn rectify_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RectifiedTransaction>> {
    check_permission(&current_user.0, "transactions", "rectify")?;
    let rectified = state
        .services
        .transactions
        .rectify(id, &current_user.0.username)
        .await?;
    Ok(Json(rectified))
}
