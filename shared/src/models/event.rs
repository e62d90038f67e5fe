//! Change notifications published after every successful write

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::TransactionStatus;
use crate::types::{CountLedger, CountSource};

/// One change to ledger state. Subscribers refresh the views that depend
/// on the affected key instead of polling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    CountWritten {
        ledger: CountLedger,
        sku: String,
        location: String,
        amount: Decimal,
        source: CountSource,
        timestamp: DateTime<Utc>,
    },
    BatchChanged {
        sku: String,
        location: String,
        total_allocated: Decimal,
    },
    BatchTargetSet {
        batch_id: String,
        expected_quantity: Decimal,
    },
    TransactionChanged {
        id: Uuid,
        status: TransactionStatus,
    },
    CatalogChanged {
        sku: String,
    },
    ChecklistCreated {
        id: Uuid,
    },
    InspectionRecorded {
        id: Uuid,
        checklist_id: Uuid,
        sku: String,
        passed: bool,
    },
}

impl LedgerEvent {
    /// Event name used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::CountWritten { .. } => "count_written",
            LedgerEvent::BatchChanged { .. } => "batch_changed",
            LedgerEvent::BatchTargetSet { .. } => "batch_target_set",
            LedgerEvent::TransactionChanged { .. } => "transaction_changed",
            LedgerEvent::CatalogChanged { .. } => "catalog_changed",
            LedgerEvent::ChecklistCreated { .. } => "checklist_created",
            LedgerEvent::InspectionRecorded { .. } => "inspection_recorded",
        }
    }

    /// SKU the event concerns, when it concerns one
    pub fn sku(&self) -> Option<&str> {
        match self {
            LedgerEvent::CountWritten { sku, .. }
            | LedgerEvent::BatchChanged { sku, .. }
            | LedgerEvent::CatalogChanged { sku }
            | LedgerEvent::InspectionRecorded { sku, .. } => Some(sku),
            _ => None,
        }
    }
}
