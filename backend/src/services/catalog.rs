//! Item master and scan lookup maintenance

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{validate_count_amount, validate_location, validate_sku, ItemMaster, LedgerEvent, ScanLookup};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ChangeFeed;
use crate::store::CatalogRepository;

/// Catalog service for reference data
#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
    feed: ChangeFeed,
}

/// Input for creating or replacing an item master record
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertItemInput {
    pub sku: String,
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
}

/// Input for creating or replacing a scan lookup
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertScanLookupInput {
    pub sku: String,
    pub target_zone: String,
    #[validate(length(min = 1, max = 200, message = "Item name must be 1-200 characters"))]
    pub item_name: String,
    pub expected_quantity: Option<Decimal>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>, feed: ChangeFeed) -> Self {
        Self { repo, feed }
    }

    pub async fn get_item(&self, sku: &str) -> AppResult<ItemMaster> {
        self.repo
            .get_item(sku)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {}", sku)))
    }

    pub async fn find_item(&self, sku: &str) -> AppResult<Option<ItemMaster>> {
        self.repo.get_item(sku).await
    }

    pub async fn list_items(&self) -> AppResult<Vec<ItemMaster>> {
        self.repo.list_items().await
    }

    pub async fn upsert_item(&self, input: UpsertItemInput) -> AppResult<ItemMaster> {
        input.validate()?;
        let sku = input.sku.trim().to_uppercase();
        validate_sku(&sku).map_err(|m| AppError::validation("sku", m))?;

        let item = ItemMaster {
            sku,
            name: input.name.trim().to_string(),
            category: input.category,
            unit: input.unit,
        };
        self.repo.upsert_item(&item).await?;

        tracing::info!(sku = %item.sku, "Item master updated");
        self.feed.publish(LedgerEvent::CatalogChanged {
            sku: item.sku.clone(),
        });
        Ok(item)
    }

    /// Display name for a SKU: item master, then the caller's name, then
    /// the SKU itself.
    pub async fn resolve_name(&self, sku: &str, fallback: Option<&str>) -> AppResult<String> {
        if let Some(item) = self.repo.get_item(sku).await? {
            return Ok(item.name);
        }
        Ok(fallback
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(sku)
            .to_string())
    }

    /// SKU → canonical name for every item master record
    pub async fn names(&self) -> AppResult<HashMap<String, String>> {
        Ok(self
            .repo
            .list_items()
            .await?
            .into_iter()
            .map(|i| (i.sku, i.name))
            .collect())
    }

    pub async fn find_scan_lookup(&self, sku: &str) -> AppResult<Option<ScanLookup>> {
        self.repo.get_scan_lookup(sku).await
    }

    pub async fn list_scan_lookups(&self) -> AppResult<Vec<ScanLookup>> {
        self.repo.list_scan_lookups().await
    }

    pub async fn upsert_scan_lookup(&self, input: UpsertScanLookupInput) -> AppResult<ScanLookup> {
        input.validate()?;
        let sku = input.sku.trim().to_uppercase();
        validate_sku(&sku).map_err(|m| AppError::validation("sku", m))?;
        validate_location(&input.target_zone).map_err(|m| AppError::validation("target_zone", m))?;
        if let Some(expected) = input.expected_quantity {
            validate_count_amount(expected)
                .map_err(|m| AppError::validation("expected_quantity", m))?;
        }

        let lookup = ScanLookup {
            sku,
            target_zone: input.target_zone,
            item_name: input.item_name.trim().to_string(),
            expected_quantity: input.expected_quantity,
        };
        self.repo.upsert_scan_lookup(&lookup).await?;

        tracing::info!(sku = %lookup.sku, zone = %lookup.target_zone, "Scan lookup updated");
        self.feed.publish(LedgerEvent::CatalogChanged {
            sku: lookup.sku.clone(),
        });
        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryStore::new()), ChangeFeed::default())
    }

    #[tokio::test]
    async fn test_resolve_name_fallbacks() {
        let catalog = service();
        catalog
            .upsert_item(UpsertItemInput {
                sku: "a001".to_string(),
                name: "Steel bolt M8".to_string(),
                category: None,
                unit: Some("pcs".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(
            catalog.resolve_name("A001", Some("bolt")).await.unwrap(),
            "Steel bolt M8"
        );
        assert_eq!(catalog.resolve_name("B002", Some("Washer")).await.unwrap(), "Washer");
        assert_eq!(catalog.resolve_name("B002", Some("  ")).await.unwrap(), "B002");
        assert_eq!(catalog.resolve_name("B002", None).await.unwrap(), "B002");
    }

    #[tokio::test]
    async fn test_scan_lookup_requires_valid_zone() {
        let err = service()
            .upsert_scan_lookup(UpsertScanLookupInput {
                sku: "A001".to_string(),
                target_zone: "production_zone_x".to_string(),
                item_name: "Bolt".to_string(),
                expected_quantity: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "target_zone"));
    }
}
