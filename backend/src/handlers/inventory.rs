//! HTTP handlers for inventory count endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    zone_columns, ComparedRow, CountLedger, InventoryCountEntry, InventorySummaryRow,
    LocationFilter,
};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::inventory::RecordCountInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    #[serde(default)]
    pub ledger: CountLedger,
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub baseline: Option<CountLedger>,
    pub against: Option<CountLedger>,
    #[serde(default)]
    pub filter: LocationFilter,
}

#[derive(Debug, Deserialize)]
pub struct CurrentQuery {
    pub sku: String,
    pub location: String,
}

/// Summary rows plus the zone columns present in them
#[derive(Debug, Serialize)]
pub struct InventorySummaryResponse {
    pub ledger: CountLedger,
    pub zones: Vec<u32>,
    pub rows: Vec<InventorySummaryRow>,
}

#[derive(Debug, Serialize)]
pub struct CurrentAmountResponse {
    pub sku: String,
    pub location: String,
    pub amount: Decimal,
}

/// Record a manual count
pub async fn record_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordCountInput>,
) -> AppResult<Json<InventoryCountEntry>> {
    check_permission(&current_user.0, "inventory", "write")?;
    let entry = state
        .services
        .inventory
        .record_count(input, &current_user.0.username)
        .await?;
    Ok(Json(entry))
}

/// Raw history of one ledger
pub async fn list_counts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<Vec<InventoryCountEntry>>> {
    check_permission(&current_user.0, "inventory", "read")?;
    let entries = state.services.inventory.list_counts(query.ledger).await?;
    Ok(Json(entries))
}

/// Per-SKU summary with logistics, zone and grand totals
pub async fn get_inventory_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<InventorySummaryResponse>> {
    check_permission(&current_user.0, "inventory", "read")?;
    let rows = state.services.inventory.summary(query.ledger).await?;
    Ok(Json(InventorySummaryResponse {
        ledger: query.ledger,
        zones: zone_columns(&rows),
        rows,
    }))
}

/// Compared view, expected vs checked by default
pub async fn compare_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<CompareQuery>,
) -> AppResult<Json<Vec<ComparedRow>>> {
    check_permission(&current_user.0, "inventory", "read")?;
    let rows = state
        .services
        .inventory
        .compare(
            query.baseline.unwrap_or(CountLedger::Expected),
            query.against.unwrap_or(CountLedger::Checked),
            query.filter,
        )
        .await?;
    Ok(Json(rows))
}

/// Current checked amount for one key
pub async fn get_current_amount(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<CurrentQuery>,
) -> AppResult<Json<CurrentAmountResponse>> {
    check_permission(&current_user.0, "inventory", "read")?;
    let sku = query.sku.trim().to_uppercase();
    let amount = state.services.inventory.current(&sku, &query.location).await?;
    Ok(Json(CurrentAmountResponse {
        sku,
        location: query.location,
        amount,
    }))
}
