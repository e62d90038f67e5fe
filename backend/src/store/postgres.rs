//! PostgreSQL store
//!
//! Running totals are serialized per key with a transaction-scoped advisory
//! lock; batch documents are updated under `SELECT ... FOR UPDATE`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    BatchAllocation, BatchTarget, ChecklistItem, CountDelta, CountLedger, CountSource,
    InspectionResult, InventoryCountEntry, ItemMaster, NewCountEntry, QaChecklist, QaInspection,
    ScanLookup, Transaction, TransactionItem, TransactionStatus, TransactionType,
};
use sqlx::{types::Json, FromRow, PgPool, Postgres};
use uuid::Uuid;

use super::{
    BatchRepository, CatalogRepository, CountRepository, InspectionFilter, QaRepository,
    TransactionRepository,
};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct CountRow {
    id: Uuid,
    ledger: String,
    sku: String,
    item_name: String,
    amount: Decimal,
    location: String,
    counted_by: String,
    source: String,
    timestamp: DateTime<Utc>,
}

impl TryFrom<CountRow> for InventoryCountEntry {
    type Error = AppError;

    fn try_from(row: CountRow) -> Result<Self, Self::Error> {
        Ok(InventoryCountEntry {
            id: row.id,
            ledger: CountLedger::from_str(&row.ledger)
                .ok_or_else(|| AppError::Internal(format!("unknown ledger '{}'", row.ledger)))?,
            source: CountSource::from_str(&row.source)
                .ok_or_else(|| AppError::Internal(format!("unknown source '{}'", row.source)))?,
            sku: row.sku,
            item_name: row.item_name,
            amount: row.amount,
            location: row.location,
            counted_by: row.counted_by,
            timestamp: row.timestamp,
        })
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    sku: String,
    location: String,
    allocations: Json<BTreeMap<String, Decimal>>,
    total_allocated: Decimal,
    last_updated: DateTime<Utc>,
}

impl From<BatchRow> for BatchAllocation {
    fn from(row: BatchRow) -> Self {
        BatchAllocation {
            sku: row.sku,
            location: row.location,
            allocations: row.allocations.0,
            total_allocated: row.total_allocated,
            last_updated: row.last_updated,
        }
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    items: Json<Vec<TransactionItem>>,
    from_location: String,
    to_location: String,
    transaction_type: String,
    status: String,
    from_batch: Option<String>,
    to_batch: Option<String>,
    performed_by: String,
    approved_by: Option<String>,
    timestamp: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    rectifies: Option<Uuid>,
    otp_digest: Option<String>,
    otp_expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            items: row.items.0,
            from_location: row.from_location,
            to_location: row.to_location,
            transaction_type: TransactionType::from_str(&row.transaction_type).ok_or_else(|| {
                AppError::Internal(format!("unknown transaction type '{}'", row.transaction_type))
            })?,
            status: TransactionStatus::from_str(&row.status)
                .ok_or_else(|| AppError::Internal(format!("unknown status '{}'", row.status)))?,
            from_batch: row.from_batch,
            to_batch: row.to_batch,
            performed_by: row.performed_by,
            approved_by: row.approved_by,
            timestamp: row.timestamp,
            completed_at: row.completed_at,
            rectifies: row.rectifies,
            otp_digest: row.otp_digest,
            otp_expires_at: row.otp_expires_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ChecklistRow {
    id: Uuid,
    name: String,
    items: Json<Vec<ChecklistItem>>,
    created_at: DateTime<Utc>,
}

impl From<ChecklistRow> for QaChecklist {
    fn from(row: ChecklistRow) -> Self {
        QaChecklist {
            id: row.id,
            name: row.name,
            items: row.items.0,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct InspectionRow {
    id: Uuid,
    checklist_id: Uuid,
    sku: String,
    batch_id: Option<String>,
    location: String,
    inspector: String,
    results: Json<Vec<InspectionResult>>,
    passed: bool,
    timestamp: DateTime<Utc>,
}

impl From<InspectionRow> for QaInspection {
    fn from(row: InspectionRow) -> Self {
        QaInspection {
            id: row.id,
            checklist_id: row.checklist_id,
            sku: row.sku,
            batch_id: row.batch_id,
            location: row.location,
            inspector: row.inspector,
            results: row.results.0,
            passed: row.passed,
            timestamp: row.timestamp,
        }
    }
}

const COUNT_COLUMNS: &str =
    r#"id, ledger, sku, item_name, amount, location, counted_by, source, "timestamp""#;

const TRANSACTION_COLUMNS: &str = r#"id, items, from_location, to_location, transaction_type,
    status, from_batch, to_batch, performed_by, approved_by, "timestamp", completed_at,
    rectifies, otp_digest, otp_expires_at"#;

// ============================================================================
// Count ledgers
// ============================================================================

/// Serialize writers of one (ledger, sku, location) key until commit
async fn lock_count_key(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    ledger: CountLedger,
    sku: &str,
    location: &str,
) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("{}/{}/{}", ledger.as_str(), sku, location))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_count(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    entry: NewCountEntry,
) -> AppResult<InventoryCountEntry> {
    let row = sqlx::query_as::<_, CountRow>(&format!(
        r#"
        INSERT INTO inventory_counts
            (id, ledger, sku, item_name, amount, location, counted_by, source, "timestamp")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        COUNT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(entry.ledger.as_str())
    .bind(&entry.sku)
    .bind(&entry.item_name)
    .bind(entry.amount)
    .bind(&entry.location)
    .bind(&entry.counted_by)
    .bind(entry.source.as_str())
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await?;

    row.try_into()
}

#[async_trait]
impl CountRepository for PgStore {
    async fn append(&self, entry: NewCountEntry) -> AppResult<InventoryCountEntry> {
        let mut tx = self.db.begin().await?;
        lock_count_key(&mut tx, entry.ledger, &entry.sku, &entry.location).await?;
        let stored = insert_count(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn apply_delta(&self, delta: CountDelta) -> AppResult<InventoryCountEntry> {
        let mut tx = self.db.begin().await?;
        lock_count_key(&mut tx, CountLedger::Checked, &delta.sku, &delta.location).await?;

        let previous = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT amount FROM inventory_counts
            WHERE ledger = $1 AND sku = $2 AND location = $3
            ORDER BY "timestamp" DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(CountLedger::Checked.as_str())
        .bind(&delta.sku)
        .bind(&delta.location)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(Decimal::ZERO);
        let amount = previous
            .checked_add(delta.delta)
            .ok_or_else(|| AppError::validation("amount", "Running total out of range"))?;

        let stored = insert_count(
            &mut tx,
            NewCountEntry {
                sku: delta.sku,
                item_name: delta.item_name,
                amount,
                location: delta.location,
                counted_by: delta.counted_by,
                ledger: CountLedger::Checked,
                source: delta.source,
            },
        )
        .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn latest(
        &self,
        ledger: CountLedger,
        sku: &str,
        location: &str,
    ) -> AppResult<Option<InventoryCountEntry>> {
        let row = sqlx::query_as::<_, CountRow>(&format!(
            r#"
            SELECT {} FROM inventory_counts
            WHERE ledger = $1 AND sku = $2 AND location = $3
            ORDER BY "timestamp" DESC, seq DESC
            LIMIT 1
            "#,
            COUNT_COLUMNS
        ))
        .bind(ledger.as_str())
        .bind(sku)
        .bind(location)
        .fetch_optional(&self.db)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, ledger: CountLedger) -> AppResult<Vec<InventoryCountEntry>> {
        let rows = sqlx::query_as::<_, CountRow>(&format!(
            r#"SELECT {} FROM inventory_counts WHERE ledger = $1 ORDER BY "timestamp", seq"#,
            COUNT_COLUMNS
        ))
        .bind(ledger.as_str())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

// ============================================================================
// Batch allocations
// ============================================================================

#[async_trait]
impl BatchRepository for PgStore {
    async fn get(&self, sku: &str, location: &str) -> AppResult<Option<BatchAllocation>> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT sku, location, allocations, total_allocated, last_updated
            FROM batch_allocations
            WHERE sku = $1 AND location = $2
            "#,
        )
        .bind(sku)
        .bind(location)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(&self) -> AppResult<Vec<BatchAllocation>> {
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT sku, location, allocations, total_allocated, last_updated
            FROM batch_allocations
            ORDER BY sku, location
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn adjust(
        &self,
        sku: &str,
        location: &str,
        batch_id: &str,
        delta: Decimal,
    ) -> AppResult<(BatchAllocation, Decimal)> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO batch_allocations (sku, location)
            VALUES ($1, $2)
            ON CONFLICT (sku, location) DO NOTHING
            "#,
        )
        .bind(sku)
        .bind(location)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT sku, location, allocations, total_allocated, last_updated
            FROM batch_allocations
            WHERE sku = $1 AND location = $2
            FOR UPDATE
            "#,
        )
        .bind(sku)
        .bind(location)
        .fetch_one(&mut *tx)
        .await?;

        let mut doc: BatchAllocation = row.into();
        let applied = doc.apply_delta(batch_id, delta, Utc::now());

        sqlx::query(
            r#"
            UPDATE batch_allocations
            SET allocations = $3, total_allocated = $4, last_updated = $5
            WHERE sku = $1 AND location = $2
            "#,
        )
        .bind(sku)
        .bind(location)
        .bind(Json(&doc.allocations))
        .bind(doc.total_allocated)
        .bind(doc.last_updated)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((doc, applied))
    }

    async fn upsert_target(&self, batch_id: &str, expected: Decimal) -> AppResult<BatchTarget> {
        let (batch_id, expected_quantity, updated_at) =
            sqlx::query_as::<_, (String, Decimal, DateTime<Utc>)>(
                r#"
                INSERT INTO batch_targets (batch_id, expected_quantity, updated_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (batch_id)
                DO UPDATE SET expected_quantity = EXCLUDED.expected_quantity, updated_at = NOW()
                RETURNING batch_id, expected_quantity, updated_at
                "#,
            )
            .bind(batch_id)
            .bind(expected)
            .fetch_one(&self.db)
            .await?;

        Ok(BatchTarget {
            batch_id,
            expected_quantity,
            updated_at,
        })
    }

    async fn list_targets(&self) -> AppResult<Vec<BatchTarget>> {
        let rows = sqlx::query_as::<_, (String, Decimal, DateTime<Utc>)>(
            "SELECT batch_id, expected_quantity, updated_at FROM batch_targets ORDER BY batch_id",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| BatchTarget {
                batch_id: r.0,
                expected_quantity: r.1,
                updated_at: r.2,
            })
            .collect())
    }
}

// ============================================================================
// Transactions
// ============================================================================

#[async_trait]
impl TransactionRepository for PgStore {
    async fn insert(&self, t: &Transaction) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO transactions ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(t.id)
        .bind(Json(&t.items))
        .bind(&t.from_location)
        .bind(&t.to_location)
        .bind(t.transaction_type.as_str())
        .bind(t.status.as_str())
        .bind(&t.from_batch)
        .bind(&t.to_batch)
        .bind(&t.performed_by)
        .bind(&t.approved_by)
        .bind(t.timestamp)
        .bind(t.completed_at)
        .bind(t.rectifies)
        .bind(&t.otp_digest)
        .bind(t.otp_expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE id = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, status: Option<TransactionStatus>) -> AppResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE $1::varchar IS NULL OR status = $1
            ORDER BY "timestamp" DESC
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn transition(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
        approved_by: Option<&str>,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE transactions
            SET status = $3,
                approved_by = COALESCE($4, approved_by),
                completed_at = CASE WHEN $3 = 'completed' THEN $5 ELSE completed_at END
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(approved_by)
        .bind(at)
        .fetch_optional(&self.db)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[async_trait]
impl CatalogRepository for PgStore {
    async fn get_item(&self, sku: &str) -> AppResult<Option<ItemMaster>> {
        let row = sqlx::query_as::<_, (String, String, Option<String>, Option<String>)>(
            "SELECT sku, name, category, unit FROM item_master WHERE sku = $1",
        )
        .bind(sku)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| ItemMaster {
            sku: r.0,
            name: r.1,
            category: r.2,
            unit: r.3,
        }))
    }

    async fn list_items(&self) -> AppResult<Vec<ItemMaster>> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>, Option<String>)>(
            "SELECT sku, name, category, unit FROM item_master ORDER BY sku",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ItemMaster {
                sku: r.0,
                name: r.1,
                category: r.2,
                unit: r.3,
            })
            .collect())
    }

    async fn upsert_item(&self, item: &ItemMaster) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO item_master (sku, name, category, unit)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (sku)
            DO UPDATE SET name = EXCLUDED.name, category = EXCLUDED.category, unit = EXCLUDED.unit
            "#,
        )
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.unit)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn get_scan_lookup(&self, sku: &str) -> AppResult<Option<ScanLookup>> {
        let row = sqlx::query_as::<_, (String, String, String, Option<Decimal>)>(
            "SELECT sku, target_zone, item_name, expected_quantity FROM scan_lookups WHERE sku = $1",
        )
        .bind(sku)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| ScanLookup {
            sku: r.0,
            target_zone: r.1,
            item_name: r.2,
            expected_quantity: r.3,
        }))
    }

    async fn list_scan_lookups(&self) -> AppResult<Vec<ScanLookup>> {
        let rows = sqlx::query_as::<_, (String, String, String, Option<Decimal>)>(
            "SELECT sku, target_zone, item_name, expected_quantity FROM scan_lookups ORDER BY sku",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ScanLookup {
                sku: r.0,
                target_zone: r.1,
                item_name: r.2,
                expected_quantity: r.3,
            })
            .collect())
    }

    async fn upsert_scan_lookup(&self, lookup: &ScanLookup) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scan_lookups (sku, target_zone, item_name, expected_quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (sku)
            DO UPDATE SET target_zone = EXCLUDED.target_zone,
                          item_name = EXCLUDED.item_name,
                          expected_quantity = EXCLUDED.expected_quantity
            "#,
        )
        .bind(&lookup.sku)
        .bind(&lookup.target_zone)
        .bind(&lookup.item_name)
        .bind(lookup.expected_quantity)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

// ============================================================================
// QA
// ============================================================================

#[async_trait]
impl QaRepository for PgStore {
    async fn insert_checklist(&self, checklist: &QaChecklist) -> AppResult<()> {
        sqlx::query("INSERT INTO qa_checklists (id, name, items, created_at) VALUES ($1, $2, $3, $4)")
            .bind(checklist.id)
            .bind(&checklist.name)
            .bind(Json(&checklist.items))
            .bind(checklist.created_at)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn get_checklist(&self, id: Uuid) -> AppResult<Option<QaChecklist>> {
        let row = sqlx::query_as::<_, ChecklistRow>(
            "SELECT id, name, items, created_at FROM qa_checklists WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_checklists(&self) -> AppResult<Vec<QaChecklist>> {
        let rows = sqlx::query_as::<_, ChecklistRow>(
            "SELECT id, name, items, created_at FROM qa_checklists ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_inspection(&self, inspection: &QaInspection) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO qa_inspections
                (id, checklist_id, sku, batch_id, location, inspector, results, passed, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(inspection.id)
        .bind(inspection.checklist_id)
        .bind(&inspection.sku)
        .bind(&inspection.batch_id)
        .bind(&inspection.location)
        .bind(&inspection.inspector)
        .bind(Json(&inspection.results))
        .bind(inspection.passed)
        .bind(inspection.timestamp)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn list_inspections(&self, filter: &InspectionFilter) -> AppResult<Vec<QaInspection>> {
        let rows = sqlx::query_as::<_, InspectionRow>(
            r#"
            SELECT id, checklist_id, sku, batch_id, location, inspector, results, passed, "timestamp"
            FROM qa_inspections
            WHERE ($1::varchar IS NULL OR sku = $1)
              AND ($2::varchar IS NULL OR batch_id = $2)
            ORDER BY "timestamp" DESC
            "#,
        )
        .bind(&filter.sku)
        .bind(&filter.batch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
