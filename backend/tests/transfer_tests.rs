//! Transfer effect tests
//!
//! Location totals, batch moves, BOM handling, strict allocation mode,
//! rectification and concurrent writers against the in-process store.

mod common;

use std::time::Duration;

use common::{dec, harness, harness_with, seed_count, SECRET};
use shared::{CountLedger, CountSource, LineStatus, NewCountEntry};
use stock_ledger_backend::{
    config::Config,
    services::transaction::{CreateTransactionInput, TransactionItemInput},
    store::{CountRepository, MemoryStore},
    AppError,
};

fn transfer(sku: &str, amount: i64, from_batch: Option<&str>) -> CreateTransactionInput {
    CreateTransactionInput {
        sku: Some(sku.to_string()),
        amount: Some(dec(amount)),
        from_location: "logistics".to_string(),
        to_location: "production_zone_2".to_string(),
        from_batch: from_batch.map(str::to_string),
        ..Default::default()
    }
}

// ============================================================================
// Location totals and batch moves
// ============================================================================

#[tokio::test]
async fn test_shortfall_moves_available_and_shifts_full_total() {
    let h = harness();
    seed_count(&h.services, "A001", "logistics", 100).await;
    h.services
        .batches
        .add("A001", "logistics", "LOT-1", dec(6))
        .await
        .unwrap();

    let created = h
        .services
        .transactions
        .create(transfer("A001", 10, Some("LOT-1")), "alice")
        .await
        .unwrap();
    let confirmed = h
        .services
        .transactions
        .confirm(created.transaction.id, &created.otp, "bob")
        .await
        .unwrap();

    // Totals move by the full amount
    assert_eq!(h.services.inventory.current("A001", "logistics").await.unwrap(), dec(90));
    assert_eq!(
        h.services.inventory.current("A001", "production_zone_2").await.unwrap(),
        dec(10)
    );

    // Batches only move what the source bucket held
    let source = h.services.batches.get("A001", "logistics").await.unwrap();
    let destination = h.services.batches.get("A001", "production_zone_2").await.unwrap();
    assert_eq!(source.available("LOT-1"), dec(0));
    assert_eq!(destination.available("LOT-1"), dec(6));

    // The desync is reported, not hidden
    let line = &confirmed.outcome.lines[0];
    assert_eq!(line.requested, dec(10));
    assert_eq!(line.moved_from_batch, dec(6));
    assert_eq!(line.shortfall, dec(4));
    assert_eq!(line.status, LineStatus::PartialAllocation);
    assert!(confirmed.outcome.is_partial());
    assert_ne!(
        h.services.inventory.current("A001", "production_zone_2").await.unwrap(),
        destination.total_allocated
    );
}

#[tokio::test]
async fn test_destination_batch_defaults_to_source_batch() {
    let h = harness();
    h.services
        .batches
        .add("A001", "logistics", "LOT-1", dec(20))
        .await
        .unwrap();

    let mut input = transfer("A001", 5, Some("LOT-1"));
    input.to_batch = Some("LOT-2".to_string());
    let created = h.services.transactions.create(input, "alice").await.unwrap();
    h.services
        .transactions
        .confirm(created.transaction.id, &created.otp, "bob")
        .await
        .unwrap();

    let destination = h.services.batches.get("A001", "production_zone_2").await.unwrap();
    assert_eq!(destination.available("LOT-2"), dec(5));

    let created = h
        .services
        .transactions
        .create(transfer("A001", 5, Some("LOT-1")), "alice")
        .await
        .unwrap();
    h.services
        .transactions
        .confirm(created.transaction.id, &created.otp, "bob")
        .await
        .unwrap();

    let destination = h.services.batches.get("A001", "production_zone_2").await.unwrap();
    assert_eq!(destination.available("LOT-1"), dec(5));
    assert_eq!(destination.total_allocated, dec(10));
}

#[tokio::test]
async fn test_bom_line_is_skipped() {
    let h = harness();
    seed_count(&h.services, "BOM-KIT", "logistics", 50).await;

    let input = CreateTransactionInput {
        items: Some(vec![
            TransactionItemInput {
                sku: "BOM-KIT".to_string(),
                item_name: None,
                amount: dec(5),
            },
            TransactionItemInput {
                sku: "A001".to_string(),
                item_name: Some("Bolt".to_string()),
                amount: dec(2),
            },
        ]),
        from_location: "logistics".to_string(),
        to_location: "production_zone_1".to_string(),
        ..Default::default()
    };
    let created = h.services.transactions.create(input, "alice").await.unwrap();
    let confirmed = h
        .services
        .transactions
        .confirm(created.transaction.id, &created.otp, "bob")
        .await
        .unwrap();

    assert_eq!(confirmed.outcome.lines[0].status, LineStatus::SkippedBom);
    assert_eq!(confirmed.outcome.lines[1].status, LineStatus::Applied);
    assert_eq!(h.services.inventory.current("BOM-KIT", "logistics").await.unwrap(), dec(50));
    assert_eq!(
        h.services.inventory.current("BOM-KIT", "production_zone_1").await.unwrap(),
        dec(0)
    );
    assert_eq!(
        h.services.inventory.current("A001", "production_zone_1").await.unwrap(),
        dec(2)
    );
}

#[tokio::test]
async fn test_item_master_name_used_for_totals() {
    let h = harness();
    h.services
        .catalog
        .upsert_item(stock_ledger_backend::services::catalog::UpsertItemInput {
            sku: "A001".to_string(),
            name: "Steel bolt M8".to_string(),
            category: None,
            unit: None,
        })
        .await
        .unwrap();
    seed_count(&h.services, "A001", "logistics", 10).await;

    let created = h
        .services
        .transactions
        .create(transfer("A001", 1, None), "alice")
        .await
        .unwrap();
    let confirmed = h
        .services
        .transactions
        .confirm(created.transaction.id, &created.otp, "bob")
        .await
        .unwrap();
    assert_eq!(confirmed.outcome.lines[0].item_name, "Steel bolt M8");

    let rows = h.services.inventory.summary(CountLedger::Checked).await.unwrap();
    assert_eq!(rows[0].item_name, "Steel bolt M8");
}

// ============================================================================
// Strict allocation mode
// ============================================================================

#[tokio::test]
async fn test_strict_mode_rejects_shortfall_before_any_write() {
    let mut config = Config::in_memory(SECRET);
    config.transfer.reject_partial_allocation = true;
    let h = harness_with(config, MemoryStore::new());

    seed_count(&h.services, "A001", "logistics", 100).await;
    h.services
        .batches
        .add("A001", "logistics", "LOT-1", dec(6))
        .await
        .unwrap();

    let created = h
        .services
        .transactions
        .create(transfer("A001", 10, Some("LOT-1")), "alice")
        .await
        .unwrap();
    let err = h
        .services
        .transactions
        .confirm(created.transaction.id, &created.otp, "bob")
        .await
        .unwrap_err();

    match err {
        AppError::PartialAllocation {
            sku,
            requested,
            available,
        } => {
            assert_eq!(sku, "A001");
            assert_eq!(requested, dec(10));
            assert_eq!(available, dec(6));
        }
        other => panic!("unexpected error {:?}", other),
    }

    // Nothing moved and the transaction is still pending
    assert_eq!(h.services.inventory.current("A001", "logistics").await.unwrap(), dec(100));
    assert_eq!(
        h.services
            .transactions
            .get(created.transaction.id)
            .await
            .unwrap()
            .status,
        shared::TransactionStatus::Pending
    );
}

// ============================================================================
// Rectification
// ============================================================================

#[tokio::test]
async fn test_rectification_restores_totals_and_batches() {
    let h = harness();
    seed_count(&h.services, "A001", "logistics", 100).await;
    h.services
        .batches
        .add("A001", "logistics", "LOT-1", dec(40))
        .await
        .unwrap();

    let created = h
        .services
        .transactions
        .create(transfer("A001", 10, Some("LOT-1")), "alice")
        .await
        .unwrap();
    h.services
        .transactions
        .confirm(created.transaction.id, &created.otp, "bob")
        .await
        .unwrap();

    let rectified = h
        .services
        .transactions
        .rectify(created.transaction.id, "carol")
        .await
        .unwrap();

    assert_eq!(rectified.original.status, shared::TransactionStatus::Rectified);
    assert_eq!(rectified.rectification.rectifies, Some(created.transaction.id));
    assert_eq!(h.services.inventory.current("A001", "logistics").await.unwrap(), dec(100));
    assert_eq!(
        h.services.inventory.current("A001", "production_zone_2").await.unwrap(),
        dec(0)
    );
    assert_eq!(
        h.services.batches.get("A001", "logistics").await.unwrap().available("LOT-1"),
        dec(40)
    );
    assert!(h
        .services
        .batches
        .get("A001", "production_zone_2")
        .await
        .unwrap()
        .allocations
        .is_empty());

    let rectification_entry = h
        .store
        .latest(CountLedger::Checked, "A001", "logistics")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rectification_entry.source, CountSource::Rectification);

    // A transaction is rectified at most once
    assert!(matches!(
        h.services.transactions.rectify(created.transaction.id, "carol").await,
        Err(AppError::InvalidStateTransition(_))
    ));
}

/// Confirm 10 x A001 of LOT-1 from logistics into production_zone_2
async fn completed_lot_transfer(h: &common::Harness) -> uuid::Uuid {
    seed_count(&h.services, "A001", "logistics", 100).await;
    h.services
        .batches
        .add("A001", "logistics", "LOT-1", dec(40))
        .await
        .unwrap();
    let created = h
        .services
        .transactions
        .create(transfer("A001", 10, Some("LOT-1")), "alice")
        .await
        .unwrap();
    h.services
        .transactions
        .confirm(created.transaction.id, &created.otp, "bob")
        .await
        .unwrap();
    created.transaction.id
}

#[tokio::test]
async fn test_strict_rectification_shortfall_keeps_transaction_completed() {
    let mut config = Config::in_memory(SECRET);
    config.transfer.reject_partial_allocation = true;
    let h = harness_with(config, MemoryStore::new());
    let id = completed_lot_transfer(&h).await;

    // Half of the moved lot has since been consumed at the destination
    h.services
        .batches
        .remove("A001", "production_zone_2", "LOT-1", dec(5))
        .await
        .unwrap();

    let err = h.services.transactions.rectify(id, "carol").await.unwrap_err();
    match err {
        AppError::PartialAllocation {
            sku,
            requested,
            available,
        } => {
            assert_eq!(sku, "A001");
            assert_eq!(requested, dec(10));
            assert_eq!(available, dec(5));
        }
        other => panic!("unexpected error {:?}", other),
    }

    assert_eq!(
        h.services.transactions.get(id).await.unwrap().status,
        shared::TransactionStatus::Completed
    );
    assert_eq!(h.services.transactions.list(None).await.unwrap().len(), 1);
    assert_eq!(h.services.inventory.current("A001", "logistics").await.unwrap(), dec(90));
    assert_eq!(
        h.services.inventory.current("A001", "production_zone_2").await.unwrap(),
        dec(10)
    );

    // Once the bucket is topped back up the reversal goes through
    h.services
        .batches
        .add("A001", "production_zone_2", "LOT-1", dec(5))
        .await
        .unwrap();
    let rectified = h.services.transactions.rectify(id, "carol").await.unwrap();
    assert_eq!(rectified.original.status, shared::TransactionStatus::Rectified);
    assert!(!rectified.outcome.is_partial());
    assert_eq!(h.services.transactions.list(None).await.unwrap().len(), 2);
    assert_eq!(h.services.inventory.current("A001", "logistics").await.unwrap(), dec(100));
    assert_eq!(
        h.services.batches.get("A001", "logistics").await.unwrap().available("LOT-1"),
        dec(40)
    );
}

#[tokio::test]
async fn test_rectification_reports_destination_shortfall() {
    let h = harness();
    let id = completed_lot_transfer(&h).await;
    h.services
        .batches
        .remove("A001", "production_zone_2", "LOT-1", dec(5))
        .await
        .unwrap();

    let rectified = h.services.transactions.rectify(id, "carol").await.unwrap();

    // Totals reverse in full, the batch only by what was left
    let line = &rectified.outcome.lines[0];
    assert_eq!(line.status, LineStatus::PartialAllocation);
    assert_eq!(line.moved_from_batch, dec(5));
    assert_eq!(line.shortfall, dec(5));
    assert_eq!(h.services.inventory.current("A001", "logistics").await.unwrap(), dec(100));
    assert_eq!(
        h.services.inventory.current("A001", "production_zone_2").await.unwrap(),
        dec(0)
    );
    assert_eq!(
        h.services.batches.get("A001", "logistics").await.unwrap().available("LOT-1"),
        dec(35)
    );
}

#[tokio::test]
async fn test_pending_transaction_cannot_be_rectified() {
    let h = harness();
    seed_count(&h.services, "A001", "logistics", 100).await;
    let created = h
        .services
        .transactions
        .create(transfer("A001", 10, None), "alice")
        .await
        .unwrap();

    assert!(matches!(
        h.services.transactions.rectify(created.transaction.id, "carol").await,
        Err(AppError::InvalidStateTransition(_))
    ));
    assert_eq!(h.services.inventory.current("A001", "logistics").await.unwrap(), dec(100));
    assert_eq!(h.services.transactions.list(None).await.unwrap().len(), 1);
}

// ============================================================================
// Concurrency
// ============================================================================

/// Caller-side read-then-write, as a client without atomic increments
/// would do it
async fn naive_increment(store: &MemoryStore, delta: i64) {
    let current = store
        .latest(CountLedger::Checked, "A001", "logistics")
        .await
        .unwrap()
        .map(|e| e.amount)
        .unwrap_or_default();
    store
        .append(NewCountEntry {
            sku: "A001".to_string(),
            item_name: "Bolt".to_string(),
            amount: current + dec(delta),
            location: "logistics".to_string(),
            counted_by: "worker".to_string(),
            ledger: CountLedger::Checked,
            source: CountSource::Transfer,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_read_then_write_loses_an_update() {
    let h = harness_with(
        Config::in_memory(SECRET),
        MemoryStore::with_latency(Duration::from_millis(20)),
    );
    seed_count(&h.services, "A001", "logistics", 100).await;

    tokio::join!(naive_increment(&h.store, 5), naive_increment(&h.store, 5));

    // Both writers read 100, so one of the +5 is gone
    assert_eq!(h.services.inventory.current("A001", "logistics").await.unwrap(), dec(105));
}

#[tokio::test]
async fn test_atomic_adjustments_never_lose_updates() {
    let h = harness_with(
        Config::in_memory(SECRET),
        MemoryStore::with_latency(Duration::from_millis(5)),
    );
    seed_count(&h.services, "A001", "logistics", 100).await;

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let inventory = h.services.inventory.clone();
            tokio::spawn(async move {
                inventory
                    .adjust("A001", "Bolt", "logistics", dec(5), "worker", CountSource::Scan)
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.services.inventory.current("A001", "logistics").await.unwrap(), dec(150));
}

#[tokio::test]
async fn test_concurrent_transfers_on_same_key() {
    let h = harness_with(
        Config::in_memory(SECRET),
        MemoryStore::with_latency(Duration::from_millis(5)),
    );
    seed_count(&h.services, "A001", "logistics", 100).await;
    h.services
        .batches
        .add("A001", "logistics", "LOT-1", dec(100))
        .await
        .unwrap();

    let first = h
        .services
        .transactions
        .create(transfer("A001", 7, Some("LOT-1")), "alice")
        .await
        .unwrap();
    let second = h
        .services
        .transactions
        .create(transfer("A001", 3, Some("LOT-1")), "alice")
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        h.services
            .transactions
            .confirm(first.transaction.id, &first.otp, "bob"),
        h.services
            .transactions
            .confirm(second.transaction.id, &second.otp, "bob"),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(h.services.inventory.current("A001", "logistics").await.unwrap(), dec(90));
    assert_eq!(
        h.services.inventory.current("A001", "production_zone_2").await.unwrap(),
        dec(10)
    );
    let destination = h.services.batches.get("A001", "production_zone_2").await.unwrap();
    assert_eq!(destination.available("LOT-1"), dec(10));
    assert!(destination.is_consistent());
}
