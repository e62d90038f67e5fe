//! Compared view: expected vs checked totals per SKU

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use crate::aggregation::latest_per_key;
use crate::models::{ComparedRow, InventoryCountEntry};
use crate::types::LocationFilter;

/// `discrepancy / expected`, with 1 when nothing was expected but something
/// was counted and 0 when both are zero. Saturates at `Decimal::MAX`.
pub fn discrepancy_ratio(expected_total: Decimal, checked_total: Decimal) -> Decimal {
    if expected_total.is_zero() {
        return if checked_total > Decimal::ZERO {
            Decimal::ONE
        } else {
            Decimal::ZERO
        };
    }
    expected_total
        .checked_sub(checked_total)
        .map(|d| d.abs())
        .and_then(|d| d.checked_div(expected_total.abs()))
        .unwrap_or(Decimal::MAX)
}

/// Compare two ledgers. Both inputs are reduced to the latest entry per
/// (sku, location) first; rows come back sorted by discrepancy ratio,
/// largest first, then by SKU.
pub fn compare_counts(
    expected: &[InventoryCountEntry],
    checked: &[InventoryCountEntry],
    filter: LocationFilter,
    names: &HashMap<String, String>,
) -> Vec<ComparedRow> {
    let mut totals: BTreeMap<String, (String, Decimal, Decimal)> = BTreeMap::new();

    for ((sku, location), entry) in latest_per_key(expected) {
        if !filter.matches(&location) {
            continue;
        }
        let slot = totals
            .entry(sku)
            .or_insert_with(|| (entry.item_name.clone(), Decimal::ZERO, Decimal::ZERO));
        slot.1 = slot.1.saturating_add(entry.amount);
    }

    for ((sku, location), entry) in latest_per_key(checked) {
        if !filter.matches(&location) {
            continue;
        }
        let slot = totals
            .entry(sku)
            .or_insert_with(|| (entry.item_name.clone(), Decimal::ZERO, Decimal::ZERO));
        slot.2 = slot.2.saturating_add(entry.amount);
    }

    let mut rows: Vec<ComparedRow> = totals
        .into_iter()
        .map(|(sku, (name, expected_total, checked_total))| {
            let discrepancy = expected_total.saturating_sub(checked_total).abs();
            ComparedRow {
                item_name: names.get(&sku).cloned().unwrap_or(name),
                sku,
                expected_total,
                checked_total,
                discrepancy,
                discrepancy_ratio: discrepancy_ratio(expected_total, checked_total),
                has_discrepancy: !discrepancy.is_zero(),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.discrepancy_ratio
            .cmp(&a.discrepancy_ratio)
            .then_with(|| a.sku.cmp(&b.sku))
    });
    rows
}
