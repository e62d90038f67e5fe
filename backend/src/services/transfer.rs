//! Transfer effects
//!
//! A confirmed transaction moves stock twice: the running totals of the
//! two locations, and the batch buckets when a source batch is known.
//! Totals are written first, then batch moves. The two are separate
//! documents and are not updated atomically together.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use shared::{
    is_bom_sku, CountSource, LineStatus, Transaction, TransferLineOutcome, TransferOutcome,
};

use crate::error::{AppError, AppResult};
use crate::services::batch_allocation::batch_changed;
use crate::services::{CatalogService, ChangeFeed, InventoryService};
use crate::store::BatchRepository;

#[derive(Clone)]
pub struct TransferEffects {
    inventory: InventoryService,
    catalog: CatalogService,
    batches: Arc<dyn BatchRepository>,
    feed: ChangeFeed,
    reject_partial_allocation: bool,
}

impl TransferEffects {
    pub fn new(
        inventory: InventoryService,
        catalog: CatalogService,
        batches: Arc<dyn BatchRepository>,
        feed: ChangeFeed,
        reject_partial_allocation: bool,
    ) -> Self {
        Self {
            inventory,
            catalog,
            batches,
            feed,
            reject_partial_allocation,
        }
    }

    /// In strict mode, fail with `PartialAllocation` when the source batch
    /// cannot cover every line. Lines of the same SKU are summed. No-op
    /// when strict mode is off or the transaction has no source batch.
    pub async fn ensure_full_allocation(&self, transaction: &Transaction) -> AppResult<()> {
        let Some(from_batch) = transaction.from_batch.as_deref() else {
            return Ok(());
        };
        if !self.reject_partial_allocation {
            return Ok(());
        }

        let mut requested: BTreeMap<&str, Decimal> = BTreeMap::new();
        for item in transaction.items.iter().filter(|i| !is_bom_sku(&i.sku)) {
            *requested.entry(item.sku.as_str()).or_insert(Decimal::ZERO) += item.amount;
        }

        for (sku, requested) in requested {
            let available = self
                .batches
                .get(sku, &transaction.from_location)
                .await?
                .map(|doc| doc.available(from_batch))
                .unwrap_or(Decimal::ZERO);
            if available < requested {
                return Err(AppError::PartialAllocation {
                    sku: sku.to_string(),
                    requested,
                    available,
                });
            }
        }
        Ok(())
    }

    /// `ensure_full_allocation` for the reversal of `original`, so a
    /// strict-mode shortfall is caught while `original` is still Completed.
    pub async fn ensure_rectifiable(&self, original: &Transaction) -> AppResult<()> {
        let reversal = original.rectification(&original.performed_by, Utc::now());
        self.ensure_full_allocation(&reversal).await
    }

    /// Apply location totals and batch moves for every line of
    /// `transaction`. BOM lines are skipped. A batch shortfall is logged and
    /// reported per line unless strict mode refuses it up front.
    pub async fn apply_transfer_effects(
        &self,
        transaction: &Transaction,
        source: CountSource,
    ) -> AppResult<TransferOutcome> {
        self.ensure_full_allocation(transaction).await?;

        let mut lines = Vec::with_capacity(transaction.items.len());
        for item in &transaction.items {
            if is_bom_sku(&item.sku) {
                tracing::warn!(
                    transaction_id = %transaction.id,
                    sku = %item.sku,
                    "Skipping BOM line; components are moved separately"
                );
                lines.push(TransferLineOutcome {
                    sku: item.sku.clone(),
                    item_name: item.item_name.clone().unwrap_or_else(|| item.sku.clone()),
                    requested: item.amount,
                    moved_from_batch: Decimal::ZERO,
                    shortfall: Decimal::ZERO,
                    status: LineStatus::SkippedBom,
                });
                continue;
            }

            let item_name = self
                .catalog
                .resolve_name(&item.sku, item.item_name.as_deref())
                .await?;

            self.inventory
                .adjust(
                    &item.sku,
                    &item_name,
                    &transaction.to_location,
                    item.amount,
                    &transaction.performed_by,
                    source,
                )
                .await?;
            self.inventory
                .adjust(
                    &item.sku,
                    &item_name,
                    &transaction.from_location,
                    -item.amount,
                    &transaction.performed_by,
                    source,
                )
                .await?;

            let mut moved = Decimal::ZERO;
            if let Some(from_batch) = transaction.from_batch.as_deref() {
                let (source_doc, applied) = self
                    .batches
                    .adjust(&item.sku, &transaction.from_location, from_batch, -item.amount)
                    .await?;
                moved = -applied;

                if moved > Decimal::ZERO {
                    self.feed.publish(batch_changed(&source_doc));
                    let to_batch = transaction.destination_batch().unwrap_or(from_batch);
                    let (destination_doc, _) = self
                        .batches
                        .adjust(&item.sku, &transaction.to_location, to_batch, moved)
                        .await?;
                    self.feed.publish(batch_changed(&destination_doc));
                }
            }

            let shortfall = if transaction.from_batch.is_some() {
                item.amount - moved
            } else {
                Decimal::ZERO
            };
            let status = if shortfall > Decimal::ZERO {
                tracing::warn!(
                    transaction_id = %transaction.id,
                    sku = %item.sku,
                    requested = %item.amount,
                    moved = %moved,
                    "Source batch held less than requested; totals and batches now disagree"
                );
                LineStatus::PartialAllocation
            } else {
                LineStatus::Applied
            };

            lines.push(TransferLineOutcome {
                sku: item.sku.clone(),
                item_name,
                requested: item.amount,
                moved_from_batch: moved,
                shortfall,
                status,
            });
        }

        tracing::info!(
            transaction_id = %transaction.id,
            from = %transaction.from_location,
            to = %transaction.to_location,
            lines = lines.len(),
            "Transfer effects applied"
        );

        Ok(TransferOutcome {
            transaction_id: transaction.id,
            lines,
        })
    }

    /// Reverse a completed transaction: build the rectification (locations
    /// and batches swapped) and apply its effects. The caller persists the
    /// returned transaction.
    pub async fn apply_rectification_effects(
        &self,
        original: &Transaction,
        performed_by: &str,
    ) -> AppResult<(Transaction, TransferOutcome)> {
        let rectification = original.rectification(performed_by, Utc::now());
        let outcome = self
            .apply_transfer_effects(&rectification, CountSource::Rectification)
            .await?;
        Ok((rectification, outcome))
    }
}
