//! Batch allocation models
//!
//! A batch allocation sub-divides the stock of one SKU at one location into
//! lot/batch buckets for traceability.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Batch buckets for a (sku, location) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchAllocation {
    pub sku: String,
    pub location: String,
    pub allocations: BTreeMap<String, Decimal>,
    pub total_allocated: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl BatchAllocation {
    pub fn empty(sku: &str, location: &str, now: DateTime<Utc>) -> Self {
        Self {
            sku: sku.to_string(),
            location: location.to_string(),
            allocations: BTreeMap::new(),
            total_allocated: Decimal::ZERO,
            last_updated: now,
        }
    }

    /// Quantity currently held by `batch_id`
    pub fn available(&self, batch_id: &str) -> Decimal {
        self.allocations
            .get(batch_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Apply a signed change to one bucket and return the change actually
    /// applied. Removals are clamped so a bucket never goes negative; empty
    /// buckets are dropped.
    pub fn apply_delta(&mut self, batch_id: &str, delta: Decimal, now: DateTime<Utc>) -> Decimal {
        let current = self.available(batch_id);
        let next = current.saturating_add(delta).max(Decimal::ZERO);
        let applied = next - current;

        if next.is_zero() {
            self.allocations.remove(batch_id);
        } else {
            self.allocations.insert(batch_id.to_string(), next);
        }
        self.total_allocated = self
            .allocations
            .values()
            .fold(Decimal::ZERO, |acc, v| acc.saturating_add(*v));
        self.last_updated = now;

        applied
    }

    /// Whether the stored total agrees with the bucket sum
    pub fn is_consistent(&self) -> bool {
        self.allocations.values().copied().sum::<Decimal>() == self.total_allocated
    }
}

/// Configured target quantity for a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchTarget {
    pub batch_id: String,
    pub expected_quantity: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Share of a batch held at one (sku, location)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchShare {
    pub sku: String,
    pub location: String,
    pub amount: Decimal,
}

/// Batch-centric progress view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchProgress {
    pub batch_id: String,
    pub allocated: Decimal,
    pub expected: Option<Decimal>,
    /// allocated / expected * 100, two decimal places, saturating at `Decimal::MAX`
    pub percent_complete: Option<Decimal>,
    pub shares: Vec<BatchShare>,
}

/// Pair whose allocated total exceeds the current stock at that location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationMismatch {
    pub sku: String,
    pub location: String,
    pub total_allocated: Decimal,
    pub counted: Decimal,
}

/// Fold allocation documents into one progress row per batch, sorted by
/// batch id. Batches that only have a target appear with zero allocated.
pub fn batch_progress(allocations: &[BatchAllocation], targets: &[BatchTarget]) -> Vec<BatchProgress> {
    let mut by_batch: BTreeMap<String, Vec<BatchShare>> = BTreeMap::new();

    for doc in allocations {
        for (batch_id, amount) in &doc.allocations {
            by_batch.entry(batch_id.clone()).or_default().push(BatchShare {
                sku: doc.sku.clone(),
                location: doc.location.clone(),
                amount: *amount,
            });
        }
    }
    for target in targets {
        by_batch.entry(target.batch_id.clone()).or_default();
    }

    by_batch
        .into_iter()
        .map(|(batch_id, shares)| {
            let allocated = shares
                .iter()
                .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.amount));
            let expected = targets
                .iter()
                .find(|t| t.batch_id == batch_id)
                .map(|t| t.expected_quantity);
            let percent_complete = expected
                .filter(|e| *e > Decimal::ZERO)
                .map(|e| {
                    allocated
                        .checked_div(e)
                        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                        .unwrap_or(Decimal::MAX)
                        .round_dp(2)
                });

            BatchProgress {
                batch_id,
                allocated,
                expected,
                percent_complete,
                shares,
            }
        })
        .collect()
}
