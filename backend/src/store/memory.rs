//! In-process store
//!
//! Backs tests and local runs. All state sits behind one mutex so every
//! repository call is atomic. An optional latency is awaited before each
//! call to mimic a remote round trip, which lets tests interleave
//! concurrent callers.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    latest_entry, BatchAllocation, BatchTarget, CountDelta, CountLedger, InventoryCountEntry,
    ItemMaster, NewCountEntry, QaChecklist, QaInspection, ScanLookup, Transaction,
    TransactionStatus,
};
use uuid::Uuid;

use super::{
    BatchRepository, CatalogRepository, CountRepository, InspectionFilter, QaRepository,
    TransactionRepository,
};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    counts: Vec<InventoryCountEntry>,
    batches: BTreeMap<(String, String), BatchAllocation>,
    targets: BTreeMap<String, BatchTarget>,
    transactions: Vec<Transaction>,
    items: BTreeMap<String, ItemMaster>,
    lookups: BTreeMap<String, ScanLookup>,
    checklists: Vec<QaChecklist>,
    inspections: Vec<QaInspection>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that waits `latency` before serving each call
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            latency: Some(latency),
        }
    }

    async fn round_trip(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn state(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

fn push_entry(state: &mut MemoryState, entry: NewCountEntry, now: DateTime<Utc>) -> InventoryCountEntry {
    let stored = InventoryCountEntry {
        id: Uuid::new_v4(),
        sku: entry.sku,
        item_name: entry.item_name,
        amount: entry.amount,
        location: entry.location,
        counted_by: entry.counted_by,
        timestamp: now,
        ledger: entry.ledger,
        source: entry.source,
    };
    state.counts.push(stored.clone());
    stored
}

#[async_trait]
impl CountRepository for MemoryStore {
    async fn append(&self, entry: NewCountEntry) -> AppResult<InventoryCountEntry> {
        self.round_trip().await;
        let mut state = self.state()?;
        Ok(push_entry(&mut state, entry, Utc::now()))
    }

    async fn apply_delta(&self, delta: CountDelta) -> AppResult<InventoryCountEntry> {
        self.round_trip().await;
        let mut state = self.state()?;

        let previous = latest_entry(
            state.counts.iter().filter(|e| e.ledger == CountLedger::Checked),
            &delta.sku,
            &delta.location,
        )
        .map(|e| e.amount)
        .unwrap_or(Decimal::ZERO);
        let amount = previous
            .checked_add(delta.delta)
            .ok_or_else(|| AppError::validation("amount", "Running total out of range"))?;

        let entry = NewCountEntry {
            sku: delta.sku,
            item_name: delta.item_name,
            amount,
            location: delta.location,
            counted_by: delta.counted_by,
            ledger: CountLedger::Checked,
            source: delta.source,
        };
        Ok(push_entry(&mut state, entry, Utc::now()))
    }

    async fn latest(
        &self,
        ledger: CountLedger,
        sku: &str,
        location: &str,
    ) -> AppResult<Option<InventoryCountEntry>> {
        self.round_trip().await;
        let state = self.state()?;
        Ok(latest_entry(
            state.counts.iter().filter(|e| e.ledger == ledger),
            sku,
            location,
        )
        .cloned())
    }

    async fn list(&self, ledger: CountLedger) -> AppResult<Vec<InventoryCountEntry>> {
        self.round_trip().await;
        let state = self.state()?;
        Ok(state
            .counts
            .iter()
            .filter(|e| e.ledger == ledger)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BatchRepository for MemoryStore {
    async fn get(&self, sku: &str, location: &str) -> AppResult<Option<BatchAllocation>> {
        self.round_trip().await;
        let state = self.state()?;
        Ok(state
            .batches
            .get(&(sku.to_string(), location.to_string()))
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<BatchAllocation>> {
        self.round_trip().await;
        let state = self.state()?;
        Ok(state.batches.values().cloned().collect())
    }

    async fn adjust(
        &self,
        sku: &str,
        location: &str,
        batch_id: &str,
        delta: Decimal,
    ) -> AppResult<(BatchAllocation, Decimal)> {
        self.round_trip().await;
        let mut state = self.state()?;
        let now = Utc::now();

        let doc = state
            .batches
            .entry((sku.to_string(), location.to_string()))
            .or_insert_with(|| BatchAllocation::empty(sku, location, now));
        let applied = doc.apply_delta(batch_id, delta, now);

        Ok((doc.clone(), applied))
    }

    async fn upsert_target(&self, batch_id: &str, expected: Decimal) -> AppResult<BatchTarget> {
        self.round_trip().await;
        let mut state = self.state()?;
        let target = BatchTarget {
            batch_id: batch_id.to_string(),
            expected_quantity: expected,
            updated_at: Utc::now(),
        };
        state.targets.insert(batch_id.to_string(), target.clone());
        Ok(target)
    }

    async fn list_targets(&self) -> AppResult<Vec<BatchTarget>> {
        self.round_trip().await;
        let state = self.state()?;
        Ok(state.targets.values().cloned().collect())
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn insert(&self, transaction: &Transaction) -> AppResult<()> {
        self.round_trip().await;
        let mut state = self.state()?;
        if state.transactions.iter().any(|t| t.id == transaction.id) {
            return Err(AppError::Conflict(format!("transaction {} exists", transaction.id)));
        }
        state.transactions.push(transaction.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Transaction>> {
        self.round_trip().await;
        let state = self.state()?;
        Ok(state.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn list(&self, status: Option<TransactionStatus>) -> AppResult<Vec<Transaction>> {
        self.round_trip().await;
        let state = self.state()?;
        let mut out: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
        approved_by: Option<&str>,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Transaction>> {
        self.round_trip().await;
        let mut state = self.state()?;
        let Some(tx) = state
            .transactions
            .iter_mut()
            .find(|t| t.id == id && t.status == from)
        else {
            return Ok(None);
        };

        tx.status = to;
        if let Some(approver) = approved_by {
            tx.approved_by = Some(approver.to_string());
        }
        if to == TransactionStatus::Completed {
            tx.completed_at = Some(at);
        }
        Ok(Some(tx.clone()))
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn get_item(&self, sku: &str) -> AppResult<Option<ItemMaster>> {
        self.round_trip().await;
        Ok(self.state()?.items.get(sku).cloned())
    }

    async fn list_items(&self) -> AppResult<Vec<ItemMaster>> {
        self.round_trip().await;
        Ok(self.state()?.items.values().cloned().collect())
    }

    async fn upsert_item(&self, item: &ItemMaster) -> AppResult<()> {
        self.round_trip().await;
        self.state()?.items.insert(item.sku.clone(), item.clone());
        Ok(())
    }

    async fn get_scan_lookup(&self, sku: &str) -> AppResult<Option<ScanLookup>> {
        self.round_trip().await;
        Ok(self.state()?.lookups.get(sku).cloned())
    }

    async fn list_scan_lookups(&self) -> AppResult<Vec<ScanLookup>> {
        self.round_trip().await;
        Ok(self.state()?.lookups.values().cloned().collect())
    }

    async fn upsert_scan_lookup(&self, lookup: &ScanLookup) -> AppResult<()> {
        self.round_trip().await;
        self.state()?.lookups.insert(lookup.sku.clone(), lookup.clone());
        Ok(())
    }
}

#[async_trait]
impl QaRepository for MemoryStore {
    async fn insert_checklist(&self, checklist: &QaChecklist) -> AppResult<()> {
        self.round_trip().await;
        self.state()?.checklists.push(checklist.clone());
        Ok(())
    }

    async fn get_checklist(&self, id: Uuid) -> AppResult<Option<QaChecklist>> {
        self.round_trip().await;
        Ok(self.state()?.checklists.iter().find(|c| c.id == id).cloned())
    }

    async fn list_checklists(&self) -> AppResult<Vec<QaChecklist>> {
        self.round_trip().await;
        Ok(self.state()?.checklists.clone())
    }

    async fn insert_inspection(&self, inspection: &QaInspection) -> AppResult<()> {
        self.round_trip().await;
        self.state()?.inspections.push(inspection.clone());
        Ok(())
    }

    async fn list_inspections(&self, filter: &InspectionFilter) -> AppResult<Vec<QaInspection>> {
        self.round_trip().await;
        let state = self.state()?;
        let mut out: Vec<QaInspection> = state
            .inspections
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }
}
