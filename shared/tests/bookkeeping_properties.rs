//! Bookkeeping property tests
//!
//! Properties covered:
//! - Last-write-wins: the current amount of a key is the latest entry's amount
//! - Allocation round trip: add then remove restores the allocation map
//! - Discrepancy ratio bounds

use std::collections::HashMap;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    compare_counts, current_amount, discrepancy_ratio, latest_per_key, BatchAllocation,
    CountLedger, CountSource, InventoryCountEntry, LocationFilter,
};
use uuid::Uuid;

fn entry(sku: &str, location: &str, amount: Decimal, offset_secs: i64) -> InventoryCountEntry {
    InventoryCountEntry {
        id: Uuid::new_v4(),
        sku: sku.to_string(),
        item_name: sku.to_string(),
        amount,
        location: location.to_string(),
        counted_by: "prop".to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::seconds(offset_secs),
        ledger: CountLedger::Checked,
        source: CountSource::Manual,
    }
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=100_000i64).prop_map(|n| Decimal::new(n, 1))
}

fn location_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("logistics"),
        Just("production_zone_1"),
        Just("production_zone_2"),
        Just("production_zone_10"),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The aggregated amount equals the amount of the max-timestamp entry
    #[test]
    fn prop_last_write_wins(
        observations in prop::collection::vec((amount_strategy(), 0i64..10_000), 1..30)
    ) {
        // Unique timestamps so the winner is unambiguous
        let mut seen = std::collections::HashSet::new();
        let entries: Vec<InventoryCountEntry> = observations
            .iter()
            .filter(|(_, t)| seen.insert(*t))
            .map(|(amount, t)| entry("A001", "logistics", *amount, *t))
            .collect();

        let newest = entries.iter().max_by_key(|e| e.timestamp).unwrap();
        let latest = latest_per_key(&entries);

        prop_assert_eq!(latest.len(), 1);
        prop_assert_eq!(latest.values().next().unwrap().amount, newest.amount);
        prop_assert_eq!(current_amount(&entries, "A001", "logistics"), Some(newest.amount));
    }

    /// One latest entry per distinct (sku, location)
    #[test]
    fn prop_one_entry_per_key(
        rows in prop::collection::vec(
            (prop_oneof![Just("A"), Just("B"), Just("C")], location_strategy(), amount_strategy(), 0i64..100),
            0..40
        )
    ) {
        let entries: Vec<InventoryCountEntry> = rows
            .iter()
            .map(|(sku, loc, amount, t)| entry(sku, loc, *amount, *t))
            .collect();
        let keys: std::collections::HashSet<(String, String)> = entries
            .iter()
            .map(|e| (e.sku.clone(), e.location.clone()))
            .collect();

        prop_assert_eq!(latest_per_key(&entries).len(), keys.len());
    }

    /// Adding then removing the same quantity restores the prior map
    #[test]
    fn prop_allocation_round_trip(
        existing in prop::collection::vec(("B[0-9]", 1i64..1000), 0..5),
        batch in "B[0-9]",
        qty in 1i64..1000,
    ) {
        let now = Utc::now();
        let mut alloc = BatchAllocation::empty("A001", "logistics", now);
        for (b, q) in &existing {
            alloc.apply_delta(b, Decimal::from(*q), now);
        }
        let before = alloc.allocations.clone();
        let total_before = alloc.total_allocated;

        alloc.apply_delta(&batch, Decimal::from(qty), now);
        let removed = alloc.apply_delta(&batch, -Decimal::from(qty), now);

        prop_assert_eq!(removed, -Decimal::from(qty));
        prop_assert_eq!(alloc.allocations, before);
        prop_assert_eq!(alloc.total_allocated, total_before);
    }

    /// Allocations never go negative and the total always matches the buckets
    #[test]
    fn prop_allocation_never_negative(
        deltas in prop::collection::vec(("B[0-3]", -500i64..500), 1..40)
    ) {
        let now = Utc::now();
        let mut alloc = BatchAllocation::empty("A001", "logistics", now);
        for (b, d) in &deltas {
            alloc.apply_delta(b, Decimal::from(*d), now);
            prop_assert!(alloc.allocations.values().all(|v| *v > Decimal::ZERO));
            prop_assert!(alloc.is_consistent());
        }
    }

    /// Ratio lies in [0, 1] whenever checked <= 2 * expected
    #[test]
    fn prop_ratio_bounded(expected in amount_strategy(), fraction in 0u32..=200) {
        let checked = (expected * Decimal::from(fraction) / Decimal::from(100)).round_dp(1);
        prop_assume!(checked <= expected * Decimal::TWO);

        let ratio = discrepancy_ratio(expected, checked);
        prop_assert!(ratio >= Decimal::ZERO);
        prop_assert!(ratio <= Decimal::ONE);
    }

    /// Equal totals give ratio 0, zero expected with stock gives ratio 1
    #[test]
    fn prop_ratio_fixed_points(amount in amount_strategy()) {
        prop_assert_eq!(discrepancy_ratio(amount, amount), Decimal::ZERO);
        if amount > Decimal::ZERO {
            prop_assert_eq!(discrepancy_ratio(Decimal::ZERO, amount), Decimal::ONE);
        }
    }

    /// Compared rows are ordered by non-increasing ratio
    #[test]
    fn prop_compared_rows_sorted(
        pairs in prop::collection::vec((amount_strategy(), amount_strategy()), 1..15)
    ) {
        let mut expected = Vec::new();
        let mut checked = Vec::new();
        for (i, (e, c)) in pairs.iter().enumerate() {
            let sku = format!("S{:03}", i);
            expected.push(entry(&sku, "logistics", *e, 0));
            checked.push(entry(&sku, "logistics", *c, 0));
        }

        let rows = compare_counts(&expected, &checked, LocationFilter::All, &HashMap::new());
        prop_assert_eq!(rows.len(), pairs.len());
        for pair in rows.windows(2) {
            prop_assert!(pair[0].discrepancy_ratio >= pair[1].discrepancy_ratio);
        }
    }
}
