//! Batch allocation bookkeeping
//!
//! Every change goes through `BatchRepository::adjust`, which updates one
//! bucket and the stored total together.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    batch_progress, current_amount, validate_batch_id, validate_location,
    validate_positive_amount, validate_sku, AllocationMismatch, BatchAllocation, BatchProgress,
    BatchTarget, CountLedger, LedgerEvent,
};

use crate::error::{AppError, AppResult};
use crate::services::ChangeFeed;
use crate::store::{BatchRepository, CountRepository};

/// Batch allocation service
#[derive(Clone)]
pub struct BatchAllocationService {
    batches: Arc<dyn BatchRepository>,
    counts: Arc<dyn CountRepository>,
    feed: ChangeFeed,
}

/// Input for crediting or debiting a batch bucket
#[derive(Debug, Deserialize)]
pub struct BatchMovementInput {
    pub sku: String,
    pub location: String,
    pub batch_id: String,
    pub quantity: Decimal,
}

/// Input for setting a batch target
#[derive(Debug, Deserialize)]
pub struct BatchTargetInput {
    pub expected_quantity: Decimal,
}

fn validate_movement(sku: &str, location: &str, batch_id: &str, quantity: Decimal) -> AppResult<()> {
    validate_sku(sku).map_err(|m| AppError::validation("sku", m))?;
    validate_location(location).map_err(|m| AppError::validation("location", m))?;
    validate_batch_id(batch_id).map_err(|m| AppError::validation("batch_id", m))?;
    validate_positive_amount(quantity).map_err(|m| AppError::validation("quantity", m))?;
    Ok(())
}

/// Change event for an allocation document after an adjustment
pub(crate) fn batch_changed(doc: &BatchAllocation) -> LedgerEvent {
    LedgerEvent::BatchChanged {
        sku: doc.sku.clone(),
        location: doc.location.clone(),
        total_allocated: doc.total_allocated,
    }
}

impl BatchAllocationService {
    pub fn new(
        batches: Arc<dyn BatchRepository>,
        counts: Arc<dyn CountRepository>,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            batches,
            counts,
            feed,
        }
    }

    /// Credit `quantity` to a batch bucket, creating the document if absent
    pub async fn add(
        &self,
        sku: &str,
        location: &str,
        batch_id: &str,
        quantity: Decimal,
    ) -> AppResult<BatchAllocation> {
        validate_movement(sku, location, batch_id, quantity)?;
        let (doc, _) = self.batches.adjust(sku, location, batch_id, quantity).await?;

        tracing::debug!(sku, location, batch_id, quantity = %quantity, "Batch credited");
        self.feed.publish(batch_changed(&doc));
        Ok(doc)
    }

    /// Debit up to `quantity` from a batch bucket. Returns the quantity
    /// actually removed, which is less than requested when the bucket holds
    /// less.
    pub async fn remove(
        &self,
        sku: &str,
        location: &str,
        batch_id: &str,
        quantity: Decimal,
    ) -> AppResult<Decimal> {
        validate_movement(sku, location, batch_id, quantity)?;
        let (doc, applied) = self.batches.adjust(sku, location, batch_id, -quantity).await?;
        let removed = -applied;
        if !removed.is_zero() {
            self.feed.publish(batch_changed(&doc));
        }

        if removed < quantity {
            tracing::warn!(
                sku,
                location,
                batch_id,
                requested = %quantity,
                removed = %removed,
                "Batch held less than requested"
            );
        }
        Ok(removed)
    }

    /// Allocation map for a pair; empty when nothing was ever allocated
    pub async fn get(&self, sku: &str, location: &str) -> AppResult<BatchAllocation> {
        Ok(self
            .batches
            .get(sku, location)
            .await?
            .unwrap_or_else(|| BatchAllocation::empty(sku, location, Utc::now())))
    }

    pub async fn list_all(&self) -> AppResult<Vec<BatchAllocation>> {
        self.batches.list().await
    }

    /// Progress of every batch that is allocated somewhere or has a target
    pub async fn all_progress(&self) -> AppResult<Vec<BatchProgress>> {
        let allocations = self.batches.list().await?;
        let targets = self.batches.list_targets().await?;
        Ok(batch_progress(&allocations, &targets))
    }

    pub async fn progress(&self, batch_id: &str) -> AppResult<BatchProgress> {
        self.all_progress()
            .await?
            .into_iter()
            .find(|p| p.batch_id == batch_id)
            .ok_or_else(|| AppError::NotFound(format!("Batch {}", batch_id)))
    }

    pub async fn set_target(&self, batch_id: &str, expected: Decimal) -> AppResult<BatchTarget> {
        validate_batch_id(batch_id).map_err(|m| AppError::validation("batch_id", m))?;
        validate_positive_amount(expected).map_err(|m| AppError::validation("expected_quantity", m))?;
        let target = self.batches.upsert_target(batch_id, expected).await?;

        tracing::info!(batch_id, expected = %expected, "Batch target set");
        self.feed.publish(LedgerEvent::BatchTargetSet {
            batch_id: target.batch_id.clone(),
            expected_quantity: target.expected_quantity,
        });
        Ok(target)
    }

    /// Pairs whose allocated total exceeds the current checked count at
    /// that location
    pub async fn check_consistency(&self) -> AppResult<Vec<AllocationMismatch>> {
        let allocations = self.batches.list().await?;
        let checked = self.counts.list(CountLedger::Checked).await?;

        let mismatches: Vec<AllocationMismatch> = allocations
            .into_iter()
            .filter_map(|doc| {
                let counted =
                    current_amount(&checked, &doc.sku, &doc.location).unwrap_or(Decimal::ZERO);
                (doc.total_allocated > counted).then(|| AllocationMismatch {
                    sku: doc.sku,
                    location: doc.location,
                    total_allocated: doc.total_allocated,
                    counted,
                })
            })
            .collect();

        if !mismatches.is_empty() {
            tracing::warn!(count = mismatches.len(), "Batch allocations exceed counted stock");
        }
        Ok(mismatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use shared::{CountSource, NewCountEntry};

    fn service() -> (BatchAllocationService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            BatchAllocationService::new(store.clone(), store.clone(), ChangeFeed::default()),
            store,
        )
    }

    #[tokio::test]
    async fn test_add_then_remove_round_trip() {
        let (batches, _) = service();
        let qty = Decimal::new(125, 1);

        batches.add("A001", "logistics", "LOT-1", qty).await.unwrap();
        let removed = batches.remove("A001", "logistics", "LOT-1", qty).await.unwrap();

        assert_eq!(removed, qty);
        let doc = batches.get("A001", "logistics").await.unwrap();
        assert!(doc.allocations.is_empty());
        assert_eq!(doc.total_allocated, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_remove_is_clamped() {
        let (batches, _) = service();
        batches.add("A001", "logistics", "LOT-1", Decimal::from(6)).await.unwrap();

        let removed = batches
            .remove("A001", "logistics", "LOT-1", Decimal::from(10))
            .await
            .unwrap();
        assert_eq!(removed, Decimal::from(6));
        assert_eq!(
            batches.get("A001", "logistics").await.unwrap().available("LOT-1"),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn test_progress_against_target() {
        let (batches, _) = service();
        batches.add("A001", "logistics", "LOT-1", Decimal::from(30)).await.unwrap();
        batches.add("B002", "production_zone_1", "LOT-1", Decimal::from(20)).await.unwrap();
        batches.set_target("LOT-1", Decimal::from(200)).await.unwrap();

        let progress = batches.progress("LOT-1").await.unwrap();
        assert_eq!(progress.allocated, Decimal::from(50));
        assert_eq!(progress.percent_complete, Some(Decimal::from(25)));
        assert_eq!(progress.shares.len(), 2);

        assert!(matches!(
            batches.progress("LOT-9").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_consistency_reports_overallocation() {
        let (batches, store) = service();
        store
            .append(NewCountEntry {
                sku: "A001".to_string(),
                item_name: "Bolt".to_string(),
                amount: Decimal::from(5),
                location: "logistics".to_string(),
                counted_by: "alice".to_string(),
                ledger: CountLedger::Checked,
                source: CountSource::Manual,
            })
            .await
            .unwrap();
        batches.add("A001", "logistics", "LOT-1", Decimal::from(8)).await.unwrap();

        let mismatches = batches.check_consistency().await.unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].counted, Decimal::from(5));
        assert_eq!(mismatches[0].total_allocated, Decimal::from(8));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let (batches, _) = service();
        let err = batches
            .add("A001", "logistics", "LOT-1", Decimal::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));
    }
}
