//! QR/barcode scanning
//!
//! A scan resolves a SKU from the raw payload, adds the scanned quantity to
//! the running total at the scan location and optionally credits a batch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    extract_candidates, validate_batch_id, validate_location, validate_positive_amount,
    BatchAllocation, CountSource,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{BatchAllocationService, CatalogService, InventoryService};

#[derive(Clone)]
pub struct ScanService {
    catalog: CatalogService,
    inventory: InventoryService,
    batches: BatchAllocationService,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScanInput {
    #[validate(length(min = 1, max = 2048, message = "Scan payload is required"))]
    pub payload: String,
    pub location: String,
    pub quantity: Decimal,
    pub batch_id: Option<String>,
}

/// SKU resolved from a payload
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedScan {
    pub sku: String,
    pub item_name: String,
    pub target_zone: Option<String>,
    pub expected_quantity: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct ScanOutcome {
    pub sku: String,
    pub item_name: String,
    pub location: String,
    pub new_total: Decimal,
    pub target_zone: Option<String>,
    /// Scanned somewhere other than the lookup's target zone
    pub misplaced: bool,
    pub batch: Option<BatchAllocation>,
}

impl ScanService {
    pub fn new(
        catalog: CatalogService,
        inventory: InventoryService,
        batches: BatchAllocationService,
    ) -> Self {
        Self {
            catalog,
            inventory,
            batches,
        }
    }

    /// First candidate known to the scan lookup table, otherwise the first
    /// known to the item master
    pub async fn resolve(&self, payload: &str) -> AppResult<ResolvedScan> {
        let candidates = extract_candidates(payload);

        for candidate in &candidates {
            if let Some(lookup) = self.catalog.find_scan_lookup(candidate).await? {
                let item_name = self
                    .catalog
                    .resolve_name(&lookup.sku, Some(&lookup.item_name))
                    .await?;
                return Ok(ResolvedScan {
                    sku: lookup.sku,
                    item_name,
                    target_zone: Some(lookup.target_zone),
                    expected_quantity: lookup.expected_quantity,
                });
            }
        }

        for candidate in &candidates {
            if let Some(item) = self.catalog.find_item(candidate).await? {
                return Ok(ResolvedScan {
                    sku: item.sku,
                    item_name: item.name,
                    target_zone: None,
                    expected_quantity: None,
                });
            }
        }

        tracing::debug!(candidates = ?candidates, "No SKU matched scan payload");
        Err(AppError::NotFound("No known SKU in scanned code".to_string()))
    }

    pub async fn scan(&self, input: ScanInput, counted_by: &str) -> AppResult<ScanOutcome> {
        input.validate()?;
        validate_location(&input.location).map_err(|m| AppError::validation("location", m))?;
        validate_positive_amount(input.quantity).map_err(|m| AppError::validation("quantity", m))?;
        if let Some(batch_id) = &input.batch_id {
            validate_batch_id(batch_id).map_err(|m| AppError::validation("batch_id", m))?;
        }

        let resolved = self.resolve(&input.payload).await?;

        let entry = self
            .inventory
            .adjust(
                &resolved.sku,
                &resolved.item_name,
                &input.location,
                input.quantity,
                counted_by,
                CountSource::Scan,
            )
            .await?;

        let batch = match &input.batch_id {
            Some(batch_id) => Some(
                self.batches
                    .add(&resolved.sku, &input.location, batch_id, input.quantity)
                    .await?,
            ),
            None => None,
        };

        let misplaced = resolved
            .target_zone
            .as_deref()
            .is_some_and(|zone| zone != input.location);
        if misplaced {
            tracing::warn!(
                sku = %resolved.sku,
                scanned_at = %input.location,
                target_zone = ?resolved.target_zone,
                "Item scanned outside its target zone"
            );
        }

        Ok(ScanOutcome {
            sku: resolved.sku,
            item_name: resolved.item_name,
            location: input.location,
            new_total: entry.amount,
            target_zone: resolved.target_zone,
            misplaced,
            batch,
        })
    }
}
