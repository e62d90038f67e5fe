//! Inventory aggregation
//!
//! Collapses raw count history into current-state rows. The current amount
//! of a (sku, location) key is the entry with the latest timestamp; amounts
//! are never summed across entries of the same key.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use crate::models::{InventoryCountEntry, InventorySummaryRow};
use crate::types::Location;

/// Reduce entries to the latest one per (sku, location).
///
/// Ties on timestamp go to the entry that appears later in `entries`.
pub fn latest_per_key(
    entries: &[InventoryCountEntry],
) -> BTreeMap<(String, String), &InventoryCountEntry> {
    let mut latest: BTreeMap<(String, String), &InventoryCountEntry> = BTreeMap::new();

    for entry in entries {
        let key = (entry.sku.clone(), entry.location.clone());
        match latest.get(&key) {
            Some(current) if current.timestamp > entry.timestamp => {}
            _ => {
                latest.insert(key, entry);
            }
        }
    }

    latest
}

/// Latest entry for one key, same tie rule as [`latest_per_key`]
pub fn latest_entry<'a, I>(entries: I, sku: &str, location: &str) -> Option<&'a InventoryCountEntry>
where
    I: IntoIterator<Item = &'a InventoryCountEntry>,
{
    entries
        .into_iter()
        .filter(|e| e.sku == sku && e.location == location)
        .fold(None, |best: Option<&'a InventoryCountEntry>, e| match best {
            Some(b) if b.timestamp > e.timestamp => Some(b),
            _ => Some(e),
        })
}

/// Current amount for one key, if any entry exists
pub fn current_amount(entries: &[InventoryCountEntry], sku: &str, location: &str) -> Option<Decimal> {
    latest_entry(entries, sku, location).map(|e| e.amount)
}

/// Build one summary row per SKU, sorted by SKU.
///
/// `names` overrides the display name (item master); otherwise the name on
/// the most recent entry for the SKU is used. Rows whose grand total is not
/// positive are dropped.
pub fn summarize_inventory(
    entries: &[InventoryCountEntry],
    names: &HashMap<String, String>,
) -> Vec<InventorySummaryRow> {
    let latest = latest_per_key(entries);
    let mut rows: BTreeMap<String, (InventorySummaryRow, chrono::DateTime<chrono::Utc>)> =
        BTreeMap::new();

    for ((sku, location), entry) in latest {
        let (row, seen) = rows.entry(sku.clone()).or_insert_with(|| {
            (
                InventorySummaryRow {
                    sku: sku.clone(),
                    item_name: entry.item_name.clone(),
                    logistics: Decimal::ZERO,
                    zones: BTreeMap::new(),
                    other: Decimal::ZERO,
                    total: Decimal::ZERO,
                },
                entry.timestamp,
            )
        });

        if entry.timestamp > *seen {
            row.item_name = entry.item_name.clone();
            *seen = entry.timestamp;
        }

        match Location::parse(&location) {
            Location::Logistics => row.logistics += entry.amount,
            Location::ProductionZone(n) => *row.zones.entry(n).or_insert(Decimal::ZERO) += entry.amount,
            Location::Other(_) => row.other += entry.amount,
        }
        row.total += entry.amount;
    }

    rows.into_values()
        .map(|(mut row, _)| {
            if let Some(name) = names.get(&row.sku) {
                row.item_name = name.clone();
            }
            row
        })
        .filter(|row| row.total > Decimal::ZERO)
        .collect()
}

/// Zone numbers present across rows, ascending
pub fn zone_columns(rows: &[InventorySummaryRow]) -> Vec<u32> {
    let mut zones: Vec<u32> = rows.iter().flat_map(|r| r.zones.keys().copied()).collect();
    zones.sort_unstable();
    zones.dedup();
    zones
}
