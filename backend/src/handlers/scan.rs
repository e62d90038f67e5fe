//! HTTP handlers for scanning and scan lookup maintenance

use axum::{extract::State, Json};
use serde::Deserialize;
use shared::ScanLookup;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::catalog::UpsertScanLookupInput;
use crate::services::scan::{ResolvedScan, ScanInput, ScanOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveInput {
    pub payload: String,
}

/// Record a scan: running total plus optional batch credit
pub async fn scan_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ScanInput>,
) -> AppResult<Json<ScanOutcome>> {
    check_permission(&current_user.0, "scan", "write")?;
    let outcome = state
        .services
        .scanner
        .scan(input, &current_user.0.username)
        .await?;
    Ok(Json(outcome))
}

/// Resolve a payload without writing anything
pub async fn resolve_scan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ResolveInput>,
) -> AppResult<Json<ResolvedScan>> {
    check_permission(&current_user.0, "scan", "read")?;
    Ok(Json(state.services.scanner.resolve(&input.payload).await?))
}

pub async fn list_scan_lookups(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ScanLookup>>> {
    check_permission(&current_user.0, "scan", "read")?;
    Ok(Json(state.services.catalog.list_scan_lookups().await?))
}

pub async fn upsert_scan_lookup(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<UpsertScanLookupInput>,
) -> AppResult<Json<ScanLookup>> {
    check_permission(&current_user.0, "items", "write")?;
    Ok(Json(state.services.catalog.upsert_scan_lookup(input).await?))
}
