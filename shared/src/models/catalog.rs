//! Item master and scan lookup reference data

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical name and category for a SKU
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemMaster {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
}

/// Where a scanned SKU is meant to go
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanLookup {
    pub sku: String,
    pub target_zone: String,
    pub item_name: String,
    pub expected_quantity: Option<Decimal>,
}
