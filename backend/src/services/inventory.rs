//! Inventory count service
//!
//! Manual counts are absolute observations appended as-is. Scans and
//! transfers go through [`InventoryService::adjust`], which asks the store
//! for an atomic `latest + delta` write.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    compare_counts, summarize_inventory, validate_count_amount, validate_location, validate_sku,
    ComparedRow, CountDelta, CountLedger, CountSource, InventoryCountEntry, InventorySummaryRow,
    LedgerEvent, LocationFilter, NewCountEntry,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{CatalogService, ChangeFeed};
use crate::store::CountRepository;

/// Inventory service for count ledgers and their derived views
#[derive(Clone)]
pub struct InventoryService {
    counts: Arc<dyn CountRepository>,
    catalog: CatalogService,
    feed: ChangeFeed,
}

/// Input for recording a manual count
#[derive(Debug, Deserialize, Validate)]
pub struct RecordCountInput {
    #[validate(length(min = 1, max = 64, message = "SKU must be 1-64 characters"))]
    pub sku: String,
    pub item_name: Option<String>,
    pub amount: Decimal,
    pub location: String,
    /// Defaults to the checked ledger
    pub ledger: Option<CountLedger>,
}

impl InventoryService {
    pub fn new(counts: Arc<dyn CountRepository>, catalog: CatalogService, feed: ChangeFeed) -> Self {
        Self {
            counts,
            catalog,
            feed,
        }
    }

    fn announce(&self, entry: &InventoryCountEntry) {
        self.feed.publish(LedgerEvent::CountWritten {
            ledger: entry.ledger,
            sku: entry.sku.clone(),
            location: entry.location.clone(),
            amount: entry.amount,
            source: entry.source,
            timestamp: entry.timestamp,
        });
    }

    /// Record an absolute count. Last write wins per (sku, location).
    pub async fn record_count(
        &self,
        input: RecordCountInput,
        counted_by: &str,
    ) -> AppResult<InventoryCountEntry> {
        input.validate()?;
        let sku = input.sku.trim().to_uppercase();
        validate_sku(&sku).map_err(|m| AppError::validation("sku", m))?;
        validate_location(&input.location).map_err(|m| AppError::validation("location", m))?;
        validate_count_amount(input.amount).map_err(|m| AppError::validation("amount", m))?;

        let ledger = input.ledger.unwrap_or_default();
        let item_name = self
            .catalog
            .resolve_name(&sku, input.item_name.as_deref())
            .await?;

        if ledger == CountLedger::Checked {
            if let Some(previous) = self.counts.latest(ledger, &sku, &input.location).await? {
                if previous.source.is_running_total() && previous.amount != input.amount {
                    tracing::warn!(
                        sku = %sku,
                        location = %input.location,
                        running_total = %previous.amount,
                        counted = %input.amount,
                        "Manual count supersedes a running total with a different amount"
                    );
                }
            }
        }

        let entry = self
            .counts
            .append(NewCountEntry {
                sku,
                item_name,
                amount: input.amount,
                location: input.location,
                counted_by: counted_by.to_string(),
                ledger,
                source: CountSource::Manual,
            })
            .await?;

        tracing::info!(
            sku = %entry.sku,
            location = %entry.location,
            amount = %entry.amount,
            ledger = ledger.as_str(),
            "Count recorded"
        );
        self.announce(&entry);
        Ok(entry)
    }

    /// Apply a signed change to the running total of a key in the checked
    /// ledger. The result is not clamped; a negative total is logged.
    pub async fn adjust(
        &self,
        sku: &str,
        item_name: &str,
        location: &str,
        delta: Decimal,
        counted_by: &str,
        source: CountSource,
    ) -> AppResult<InventoryCountEntry> {
        let entry = self
            .counts
            .apply_delta(CountDelta {
                sku: sku.to_string(),
                item_name: item_name.to_string(),
                location: location.to_string(),
                delta,
                counted_by: counted_by.to_string(),
                source,
            })
            .await?;

        if entry.amount < Decimal::ZERO {
            tracing::warn!(
                sku = %sku,
                location = %location,
                total = %entry.amount,
                "Running total went negative"
            );
        }
        tracing::debug!(sku = %sku, location = %location, delta = %delta, total = %entry.amount, "Running total adjusted");
        self.announce(&entry);
        Ok(entry)
    }

    pub async fn list_counts(&self, ledger: CountLedger) -> AppResult<Vec<InventoryCountEntry>> {
        self.counts.list(ledger).await
    }

    /// Current checked amount for a key, zero when never counted
    pub async fn current(&self, sku: &str, location: &str) -> AppResult<Decimal> {
        Ok(self
            .counts
            .latest(CountLedger::Checked, sku, location)
            .await?
            .map(|e| e.amount)
            .unwrap_or(Decimal::ZERO))
    }

    /// Per-SKU summary of one ledger
    pub async fn summary(&self, ledger: CountLedger) -> AppResult<Vec<InventorySummaryRow>> {
        let entries = self.counts.list(ledger).await?;
        let names = self.catalog.names().await?;
        Ok(summarize_inventory(&entries, &names))
    }

    /// Compare `against` with the `baseline` ledger, e.g. expected vs checked
    pub async fn compare(
        &self,
        baseline: CountLedger,
        against: CountLedger,
        filter: LocationFilter,
    ) -> AppResult<Vec<ComparedRow>> {
        let expected = self.counts.list(baseline).await?;
        let checked = self.counts.list(against).await?;
        let names = self.catalog.names().await?;
        Ok(compare_counts(&expected, &checked, filter, &names))
    }
}
