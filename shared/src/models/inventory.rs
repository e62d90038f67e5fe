//! Inventory count models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CountLedger, CountSource};

/// One count observation for a SKU at a location.
///
/// Entries are append-only. The current amount for a (sku, location) key is
/// the entry with the latest timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryCountEntry {
    pub id: Uuid,
    pub sku: String,
    pub item_name: String,
    pub amount: Decimal,
    pub location: String,
    pub counted_by: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ledger: CountLedger,
    #[serde(default)]
    pub source: CountSource,
}

impl InventoryCountEntry {
    pub fn key(&self) -> (&str, &str) {
        (self.sku.as_str(), self.location.as_str())
    }
}

/// Entry to be appended to a ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCountEntry {
    pub sku: String,
    pub item_name: String,
    pub amount: Decimal,
    pub location: String,
    pub counted_by: String,
    pub ledger: CountLedger,
    pub source: CountSource,
}

/// Running-total change for a (sku, location) key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountDelta {
    pub sku: String,
    pub item_name: String,
    pub location: String,
    pub delta: Decimal,
    pub counted_by: String,
    pub source: CountSource,
}

/// Per-SKU inventory row with logistics, per-zone and grand totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventorySummaryRow {
    pub sku: String,
    pub item_name: String,
    pub logistics: Decimal,
    /// Production totals keyed by zone number
    pub zones: BTreeMap<u32, Decimal>,
    /// Locations that are neither logistics nor a production zone
    pub other: Decimal,
    pub total: Decimal,
}

/// Expected vs checked totals for one SKU
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparedRow {
    pub sku: String,
    pub item_name: String,
    pub expected_total: Decimal,
    pub checked_total: Decimal,
    pub discrepancy: Decimal,
    pub discrepancy_ratio: Decimal,
    pub has_discrepancy: bool,
}
