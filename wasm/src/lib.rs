//! WebAssembly module for the Stock Ledger platform
//!
//! Provides client-side computation for:
//! - Inventory summaries from raw count entries
//! - The expected vs checked compared view
//! - Scanner candidate extraction
//! - Offline input validation
//!
//! Structured values cross the boundary as JSON strings.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    compare_counts, discrepancy_ratio, extract_candidates, summarize_inventory, zone_columns,
    InventoryCountEntry, InventorySummaryRow, LocationFilter,
};
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct SummaryView {
    zones: Vec<u32>,
    rows: Vec<InventorySummaryRow>,
}

fn parse_entries(field: &str, json: &str) -> Result<Vec<InventoryCountEntry>, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", field, e))
}

fn parse_names(json: Option<String>) -> Result<HashMap<String, String>, String> {
    match json {
        Some(json) if !json.trim().is_empty() => {
            serde_json::from_str(&json).map_err(|e| format!("Invalid names JSON: {}", e))
        }
        _ => Ok(HashMap::new()),
    }
}

fn summary_json(entries_json: &str, names_json: Option<String>) -> Result<String, String> {
    let entries = parse_entries("entries", entries_json)?;
    let names = parse_names(names_json)?;
    let rows = summarize_inventory(&entries, &names);
    let view = SummaryView {
        zones: zone_columns(&rows),
        rows,
    };
    serde_json::to_string(&view).map_err(|e| e.to_string())
}

fn compared_json(
    expected_json: &str,
    checked_json: &str,
    filter: &str,
    names_json: Option<String>,
) -> Result<String, String> {
    let expected = parse_entries("expected", expected_json)?;
    let checked = parse_entries("checked", checked_json)?;
    let filter: LocationFilter = serde_json::from_value(serde_json::Value::String(filter.to_string()))
        .map_err(|_| format!("Unknown filter '{}'", filter))?;
    let names = parse_names(names_json)?;
    serde_json::to_string(&compare_counts(&expected, &checked, filter, &names))
        .map_err(|e| e.to_string())
}

fn to_js_error(message: String) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}

/// Summarize raw count entries into per-SKU rows with zone columns
#[wasm_bindgen]
pub fn summarize_counts(entries_json: &str, names_json: Option<String>) -> Result<String, JsValue> {
    summary_json(entries_json, names_json).map_err(to_js_error)
}

/// Compared view rows, largest relative mismatch first.
/// `filter` is one of `all`, `logistics`, `production`.
#[wasm_bindgen]
pub fn compare_ledgers(
    expected_json: &str,
    checked_json: &str,
    filter: &str,
    names_json: Option<String>,
) -> Result<String, JsValue> {
    compared_json(expected_json, checked_json, filter, names_json).map_err(to_js_error)
}

/// Discrepancy ratio for two totals given as decimal strings
#[wasm_bindgen]
pub fn calculate_discrepancy_ratio(expected: &str, checked: &str) -> Result<String, JsValue> {
    let e: Decimal = expected
        .parse()
        .map_err(|_| to_js_error(format!("Invalid expected total '{}'", expected)))?;
    let c: Decimal = checked
        .parse()
        .map_err(|_| to_js_error(format!("Invalid checked total '{}'", checked)))?;
    Ok(discrepancy_ratio(e, c).to_string())
}

/// SKU candidates from a scanned payload, in lookup order
#[wasm_bindgen]
pub fn scan_candidates(payload: &str) -> js_sys::Array {
    extract_candidates(payload)
        .iter()
        .map(|c| JsValue::from_str(c))
        .collect()
}

/// Validate a SKU before queuing an offline write
#[wasm_bindgen]
pub fn is_valid_sku(sku: &str) -> bool {
    shared::validate_sku(sku).is_ok()
}

/// Validate a location before queuing an offline write
#[wasm_bindgen]
pub fn is_valid_location(location: &str) -> bool {
    shared::validate_location(location).is_ok()
}
