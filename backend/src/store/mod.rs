//! Persistence boundary
//!
//! Services talk to the document store only through these repository
//! traits. Running totals and batch buckets are changed with atomic
//! primitives (`CountRepository::apply_delta`, `BatchRepository::adjust`)
//! so concurrent writers to the same key cannot lose updates.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    BatchAllocation, BatchTarget, CountDelta, CountLedger, InventoryCountEntry, ItemMaster,
    NewCountEntry, QaChecklist, QaInspection, ScanLookup, Transaction, TransactionStatus,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Append-only count ledgers
#[async_trait]
pub trait CountRepository: Send + Sync {
    /// Append an absolute observation
    async fn append(&self, entry: NewCountEntry) -> AppResult<InventoryCountEntry>;

    /// Atomically append `latest + delta` to the checked ledger
    async fn apply_delta(&self, delta: CountDelta) -> AppResult<InventoryCountEntry>;

    /// Latest entry for a key in a ledger
    async fn latest(
        &self,
        ledger: CountLedger,
        sku: &str,
        location: &str,
    ) -> AppResult<Option<InventoryCountEntry>>;

    /// Full history of a ledger, oldest first
    async fn list(&self, ledger: CountLedger) -> AppResult<Vec<InventoryCountEntry>>;
}

/// Batch allocation documents and targets
#[async_trait]
pub trait BatchRepository: Send + Sync {
    async fn get(&self, sku: &str, location: &str) -> AppResult<Option<BatchAllocation>>;

    async fn list(&self) -> AppResult<Vec<BatchAllocation>>;

    /// Atomically apply a signed change to one bucket, creating the document
    /// when absent. Returns the updated document and the change actually
    /// applied after clamping at zero.
    async fn adjust(
        &self,
        sku: &str,
        location: &str,
        batch_id: &str,
        delta: Decimal,
    ) -> AppResult<(BatchAllocation, Decimal)>;

    async fn upsert_target(&self, batch_id: &str, expected: Decimal) -> AppResult<BatchTarget>;

    async fn list_targets(&self) -> AppResult<Vec<BatchTarget>>;
}

/// Stock transactions
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, transaction: &Transaction) -> AppResult<()>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Transaction>>;

    /// Newest first, optionally limited to one status
    async fn list(&self, status: Option<TransactionStatus>) -> AppResult<Vec<Transaction>>;

    /// Compare-and-set the status. Returns the updated transaction, or `None`
    /// when the stored status was not `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
        approved_by: Option<&str>,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Transaction>>;
}

/// Item master and scan lookup reference data
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_item(&self, sku: &str) -> AppResult<Option<ItemMaster>>;

    async fn list_items(&self) -> AppResult<Vec<ItemMaster>>;

    async fn upsert_item(&self, item: &ItemMaster) -> AppResult<()>;

    async fn get_scan_lookup(&self, sku: &str) -> AppResult<Option<ScanLookup>>;

    async fn list_scan_lookups(&self) -> AppResult<Vec<ScanLookup>>;

    async fn upsert_scan_lookup(&self, lookup: &ScanLookup) -> AppResult<()>;
}

/// Filter for inspection listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InspectionFilter {
    pub sku: Option<String>,
    pub batch_id: Option<String>,
}

impl InspectionFilter {
    pub fn matches(&self, inspection: &QaInspection) -> bool {
        self.sku.as_ref().map_or(true, |s| *s == inspection.sku)
            && self
                .batch_id
                .as_ref()
                .map_or(true, |b| inspection.batch_id.as_ref() == Some(b))
    }
}

/// QA checklists and inspections
#[async_trait]
pub trait QaRepository: Send + Sync {
    async fn insert_checklist(&self, checklist: &QaChecklist) -> AppResult<()>;

    async fn get_checklist(&self, id: Uuid) -> AppResult<Option<QaChecklist>>;

    async fn list_checklists(&self) -> AppResult<Vec<QaChecklist>>;

    async fn insert_inspection(&self, inspection: &QaInspection) -> AppResult<()>;

    /// Newest first
    async fn list_inspections(&self, filter: &InspectionFilter) -> AppResult<Vec<QaInspection>>;
}

/// Bundle of repositories handed to the services at startup
#[derive(Clone)]
pub struct Store {
    pub counts: Arc<dyn CountRepository>,
    pub batches: Arc<dyn BatchRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub qa: Arc<dyn QaRepository>,
}

impl Store {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            counts: store.clone(),
            batches: store.clone(),
            transactions: store.clone(),
            catalog: store.clone(),
            qa: store,
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            counts: store.clone(),
            batches: store.clone(),
            transactions: store.clone(),
            catalog: store.clone(),
            qa: store,
        }
    }
}
