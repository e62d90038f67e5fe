//! Stock transaction models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of stock movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Move stock between locations, e.g. logistics to a production zone
    #[default]
    Transfer,
    /// Send unused stock back from production
    Return,
    /// Reversal of a completed transaction
    Rectification,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "transfer",
            TransactionType::Return => "return",
            TransactionType::Rectification => "rectification",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "transfer" => Some(TransactionType::Transfer),
            "return" => Some(TransactionType::Return),
            "rectification" => Some(TransactionType::Rectification),
            _ => None,
        }
    }
}

/// Lifecycle status of a transaction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Rejected,
    Rectified,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Rejected => "rejected",
            TransactionStatus::Rectified => "rectified",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "completed" => Some(TransactionStatus::Completed),
            "rejected" => Some(TransactionStatus::Rejected),
            "rectified" => Some(TransactionStatus::Rectified),
            _ => None,
        }
    }

    /// Allowed moves: pending → completed | rejected, completed → rectified
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Completed)
                | (TransactionStatus::Pending, TransactionStatus::Rejected)
                | (TransactionStatus::Completed, TransactionStatus::Rectified)
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One SKU line of a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionItem {
    pub sku: String,
    pub item_name: Option<String>,
    pub amount: Decimal,
}

/// A movement of stock between two locations, optionally tied to batches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub items: Vec<TransactionItem>,
    pub from_location: String,
    pub to_location: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub from_batch: Option<String>,
    /// Destination batch; falls back to `from_batch` when absent
    pub to_batch: Option<String>,
    pub performed_by: String,
    pub approved_by: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Original transaction reversed by this one
    pub rectifies: Option<Uuid>,
    #[serde(skip_serializing, default)]
    pub otp_digest: Option<String>,
    #[serde(skip_serializing, default)]
    pub otp_expires_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Batch credited at the destination
    pub fn destination_batch(&self) -> Option<&str> {
        self.to_batch.as_deref().or(self.from_batch.as_deref())
    }

    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(|i| i.amount).sum()
    }

    /// Build the completed reversal of this transaction: locations and
    /// batches swapped, same line items.
    pub fn rectification(&self, performed_by: &str, now: DateTime<Utc>) -> Transaction {
        let destination_batch = self.destination_batch().map(str::to_string);
        Transaction {
            id: Uuid::new_v4(),
            items: self.items.clone(),
            from_location: self.to_location.clone(),
            to_location: self.from_location.clone(),
            transaction_type: TransactionType::Rectification,
            status: TransactionStatus::Completed,
            from_batch: destination_batch,
            to_batch: self.from_batch.clone(),
            performed_by: performed_by.to_string(),
            approved_by: Some(performed_by.to_string()),
            timestamp: now,
            completed_at: Some(now),
            rectifies: Some(self.id),
            otp_digest: None,
            otp_expires_at: None,
        }
    }
}

/// What happened to one line when effects were applied
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// Totals moved and, if a batch was given, the full amount moved with it
    Applied,
    /// Totals moved but the source batch held less than requested
    PartialAllocation,
    /// BOM line, nothing written
    SkippedBom,
}

/// Effect report for one transaction line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferLineOutcome {
    pub sku: String,
    pub item_name: String,
    pub requested: Decimal,
    /// Quantity moved between batch buckets (zero without a source batch)
    pub moved_from_batch: Decimal,
    pub shortfall: Decimal,
    pub status: LineStatus,
}

/// Effect report for a whole transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferOutcome {
    pub transaction_id: Uuid,
    pub lines: Vec<TransferLineOutcome>,
}

impl TransferOutcome {
    pub fn is_partial(&self) -> bool {
        self.lines
            .iter()
            .any(|l| l.status == LineStatus::PartialAllocation)
    }

    pub fn total_shortfall(&self) -> Decimal {
        self.lines.iter().map(|l| l.shortfall).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            items: vec![TransactionItem {
                sku: "A001".to_string(),
                item_name: None,
                amount: Decimal::from(10),
            }],
            from_location: "logistics".to_string(),
            to_location: "production_zone_2".to_string(),
            transaction_type: TransactionType::Transfer,
            status: TransactionStatus::Completed,
            from_batch: Some("B1".to_string()),
            to_batch: Some("B2".to_string()),
            performed_by: "alice".to_string(),
            approved_by: Some("bob".to_string()),
            timestamp: Utc::now(),
            completed_at: Some(Utc::now()),
            rectifies: None,
            otp_digest: None,
            otp_expires_at: None,
        }
    }

    #[test]
    fn test_status_transitions() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Completed.can_transition_to(Rectified));
        assert!(!Completed.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Completed));
        assert!(!Rectified.can_transition_to(Rectified));
    }

    #[test]
    fn test_rectification_swaps_locations_and_batches() {
        let original = sample();
        let rect = original.rectification("carol", Utc::now());

        assert_eq!(rect.from_location, "production_zone_2");
        assert_eq!(rect.to_location, "logistics");
        assert_eq!(rect.from_batch.as_deref(), Some("B2"));
        assert_eq!(rect.to_batch.as_deref(), Some("B1"));
        assert_eq!(rect.rectifies, Some(original.id));
        assert_eq!(rect.transaction_type, TransactionType::Rectification);
        assert_eq!(rect.status, TransactionStatus::Completed);
    }

    #[test]
    fn test_rectification_without_destination_batch() {
        let mut original = sample();
        original.to_batch = None;
        let rect = original.rectification("carol", Utc::now());
        assert_eq!(rect.from_batch.as_deref(), Some("B1"));
        assert_eq!(rect.to_batch.as_deref(), Some("B1"));
    }

    #[test]
    fn test_otp_digest_not_serialized() {
        let mut tx = sample();
        tx.otp_digest = Some("secret".to_string());
        let json = serde_json::to_string(&tx).unwrap();
        assert!(!json.contains("secret"));
    }
}
