//! Stock transaction lifecycle
//!
//! pending ──confirm(OTP)──▶ completed ──rectify──▶ rectified
//!    └──────reject────────▶ rejected
//!
//! Every status change is a compare-and-set in the store, so effects of a
//! transaction are applied at most once even under concurrent confirms.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    validate_batch_id, validate_location, validate_otp_format, validate_positive_amount,
    validate_sku, CountSource, LedgerEvent, Transaction, TransactionItem, TransactionStatus,
    TransactionType, TransferOutcome,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{ChangeFeed, OtpIssuer, TransferEffects};
use crate::store::TransactionRepository;

/// Transaction service
#[derive(Clone)]
pub struct TransactionService {
    repo: Arc<dyn TransactionRepository>,
    effects: TransferEffects,
    otp: OtpIssuer,
    feed: ChangeFeed,
}

/// One line of a new transaction
#[derive(Debug, Deserialize)]
pub struct TransactionItemInput {
    pub sku: String,
    pub item_name: Option<String>,
    pub amount: Decimal,
}

/// Input for creating a transaction. Either `items`, or the single-item
/// form `sku` + `amount` (+ `item_name`).
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateTransactionInput {
    pub items: Option<Vec<TransactionItemInput>>,
    pub sku: Option<String>,
    pub item_name: Option<String>,
    pub amount: Option<Decimal>,
    #[validate(length(min = 1, message = "Source location is required"))]
    pub from_location: String,
    #[validate(length(min = 1, message = "Destination location is required"))]
    pub to_location: String,
    pub transaction_type: Option<TransactionType>,
    pub from_batch: Option<String>,
    pub to_batch: Option<String>,
}

/// A freshly created transaction and its passcode. The passcode is not
/// retrievable afterwards.
#[derive(Debug, Serialize)]
pub struct CreatedTransaction {
    pub transaction: Transaction,
    pub otp: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmedTransaction {
    pub transaction: Transaction,
    pub outcome: TransferOutcome,
}

#[derive(Debug, Serialize)]
pub struct RectifiedTransaction {
    pub original: Transaction,
    pub rectification: Transaction,
    pub outcome: TransferOutcome,
}

fn normalize_items(input: &mut CreateTransactionInput) -> AppResult<Vec<TransactionItem>> {
    let lines = match (input.items.take(), input.sku.take(), input.amount) {
        (Some(items), None, None) => items,
        (None, Some(sku), Some(amount)) => vec![TransactionItemInput {
            sku,
            item_name: input.item_name.take(),
            amount,
        }],
        (None, _, _) => {
            return Err(AppError::validation("items", "At least one item is required"))
        }
        (Some(_), _, _) => {
            return Err(AppError::validation(
                "items",
                "Use either items or sku/amount, not both",
            ))
        }
    };

    if lines.is_empty() {
        return Err(AppError::validation("items", "At least one item is required"));
    }

    lines
        .into_iter()
        .map(|line| {
            let sku = line.sku.trim().to_uppercase();
            validate_sku(&sku).map_err(|m| AppError::validation("sku", m))?;
            validate_positive_amount(line.amount).map_err(|m| AppError::validation("amount", m))?;
            Ok(TransactionItem {
                sku,
                item_name: line.item_name,
                amount: line.amount,
            })
        })
        .collect()
}

impl TransactionService {
    pub fn new(
        repo: Arc<dyn TransactionRepository>,
        effects: TransferEffects,
        otp: OtpIssuer,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            repo,
            effects,
            otp,
            feed,
        }
    }

    fn announce(&self, transaction: &Transaction) {
        self.feed.publish(LedgerEvent::TransactionChanged {
            id: transaction.id,
            status: transaction.status,
        });
    }

    /// Validate and persist a pending transaction with a fresh OTP
    pub async fn create(
        &self,
        mut input: CreateTransactionInput,
        performed_by: &str,
    ) -> AppResult<CreatedTransaction> {
        input.validate()?;
        let items = normalize_items(&mut input)?;

        validate_location(&input.from_location).map_err(|m| AppError::validation("from_location", m))?;
        validate_location(&input.to_location).map_err(|m| AppError::validation("to_location", m))?;
        if input.from_location == input.to_location {
            return Err(AppError::validation(
                "to_location",
                "Source and destination must differ",
            ));
        }
        for (field, batch) in [("from_batch", &input.from_batch), ("to_batch", &input.to_batch)] {
            if let Some(batch) = batch {
                validate_batch_id(batch).map_err(|m| AppError::validation(field, m))?;
            }
        }
        if input.to_batch.is_some() && input.from_batch.is_none() {
            return Err(AppError::validation(
                "from_batch",
                "A destination batch needs a source batch",
            ));
        }

        let transaction_type = input.transaction_type.unwrap_or_default();
        if transaction_type == TransactionType::Rectification {
            return Err(AppError::validation(
                "transaction_type",
                "Rectifications are created by rectifying a completed transaction",
            ));
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let otp = self.otp.generate();

        let transaction = Transaction {
            id,
            items,
            from_location: input.from_location,
            to_location: input.to_location,
            transaction_type,
            status: TransactionStatus::Pending,
            from_batch: input.from_batch,
            to_batch: input.to_batch,
            performed_by: performed_by.to_string(),
            approved_by: None,
            timestamp: now,
            completed_at: None,
            rectifies: None,
            otp_digest: Some(self.otp.digest(id, &otp)?),
            otp_expires_at: Some(self.otp.expires_at(now)),
        };
        self.repo.insert(&transaction).await?;

        tracing::info!(
            transaction_id = %id,
            from = %transaction.from_location,
            to = %transaction.to_location,
            lines = transaction.items.len(),
            "Transaction created, awaiting confirmation"
        );
        self.announce(&transaction);
        Ok(CreatedTransaction { transaction, otp })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Transaction> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {}", id)))
    }

    pub async fn list(&self, status: Option<TransactionStatus>) -> AppResult<Vec<Transaction>> {
        self.repo.list(status).await
    }

    /// Check the OTP, mark the transaction completed and apply its effects
    pub async fn confirm(
        &self,
        id: Uuid,
        otp: &str,
        approved_by: &str,
    ) -> AppResult<ConfirmedTransaction> {
        let pending = self.get(id).await?;
        require_status(&pending, TransactionStatus::Pending, TransactionStatus::Completed)?;

        validate_otp_format(otp).map_err(|m| AppError::validation("otp", m))?;
        let now = Utc::now();
        match pending.otp_expires_at {
            Some(expires_at) if now > expires_at => return Err(AppError::OtpExpired),
            _ => {}
        }
        let digest = pending
            .otp_digest
            .as_deref()
            .ok_or_else(|| AppError::Internal(format!("transaction {} has no OTP digest", id)))?;
        if !self.otp.verify(id, otp, digest)? {
            tracing::warn!(transaction_id = %id, "OTP mismatch");
            return Err(AppError::OtpInvalid);
        }

        self.effects.ensure_full_allocation(&pending).await?;

        let transaction = self
            .repo
            .transition(
                id,
                TransactionStatus::Pending,
                TransactionStatus::Completed,
                Some(approved_by),
                now,
            )
            .await?
            .ok_or_else(|| lost_race(id, TransactionStatus::Completed))?;
        self.announce(&transaction);

        let outcome = self
            .effects
            .apply_transfer_effects(&transaction, CountSource::Transfer)
            .await
            .map_err(|e| {
                tracing::error!(transaction_id = %id, error = %e, "Transaction completed but effects failed");
                e
            })?;

        if outcome.is_partial() {
            tracing::warn!(
                transaction_id = %id,
                shortfall = %outcome.total_shortfall(),
                "Transaction confirmed with batch shortfall"
            );
        }
        tracing::info!(transaction_id = %id, approved_by, "Transaction confirmed");
        Ok(ConfirmedTransaction {
            transaction,
            outcome,
        })
    }

    pub async fn reject(&self, id: Uuid, approved_by: &str) -> AppResult<Transaction> {
        let pending = self.get(id).await?;
        require_status(&pending, TransactionStatus::Pending, TransactionStatus::Rejected)?;

        let transaction = self
            .repo
            .transition(
                id,
                TransactionStatus::Pending,
                TransactionStatus::Rejected,
                Some(approved_by),
                Utc::now(),
            )
            .await?
            .ok_or_else(|| lost_race(id, TransactionStatus::Rejected))?;

        tracing::info!(transaction_id = %id, approved_by, "Transaction rejected");
        self.announce(&transaction);
        Ok(transaction)
    }

    /// Reverse a completed transaction with a new completed rectification
    pub async fn rectify(&self, id: Uuid, performed_by: &str) -> AppResult<RectifiedTransaction> {
        let completed = self.get(id).await?;
        require_status(&completed, TransactionStatus::Completed, TransactionStatus::Rectified)?;
        if completed.transaction_type == TransactionType::Rectification {
            return Err(AppError::InvalidStateTransition(
                "a rectification cannot itself be rectified".to_string(),
            ));
        }
        self.effects.ensure_rectifiable(&completed).await?;

        let original = self
            .repo
            .transition(
                id,
                TransactionStatus::Completed,
                TransactionStatus::Rectified,
                None,
                Utc::now(),
            )
            .await?
            .ok_or_else(|| lost_race(id, TransactionStatus::Rectified))?;
        self.announce(&original);

        let (rectification, outcome) = self
            .effects
            .apply_rectification_effects(&original, performed_by)
            .await
            .map_err(|e| {
                tracing::error!(transaction_id = %id, error = %e, "Transaction rectified but reversal failed");
                e
            })?;
        self.repo.insert(&rectification).await?;
        self.announce(&rectification);

        tracing::info!(
            transaction_id = %id,
            rectification_id = %rectification.id,
            performed_by,
            "Transaction rectified"
        );
        Ok(RectifiedTransaction {
            original,
            rectification,
            outcome,
        })
    }
}

fn require_status(
    transaction: &Transaction,
    expected: TransactionStatus,
    next: TransactionStatus,
) -> AppResult<()> {
    if transaction.status != expected || !transaction.status.can_transition_to(next) {
        return Err(AppError::InvalidStateTransition(format!(
            "transaction {} is {}, cannot become {}",
            transaction.id, transaction.status, next
        )));
    }
    Ok(())
}

fn lost_race(id: Uuid, next: TransactionStatus) -> AppError {
    AppError::InvalidStateTransition(format!(
        "transaction {} changed status concurrently, cannot become {}",
        id, next
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CreateTransactionInput {
        CreateTransactionInput {
            sku: Some("a001".to_string()),
            amount: Some(Decimal::from(3)),
            from_location: "logistics".to_string(),
            to_location: "production_zone_1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_item_form_normalized() {
        let mut input = input();
        let items = normalize_items(&mut input).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sku, "A001");
        assert_eq!(items[0].amount, Decimal::from(3));
    }

    #[test]
    fn test_mixed_forms_rejected() {
        let mut input = input();
        input.items = Some(vec![TransactionItemInput {
            sku: "B002".to_string(),
            item_name: None,
            amount: Decimal::ONE,
        }]);
        assert!(normalize_items(&mut input).is_err());
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut input = CreateTransactionInput {
            items: Some(vec![]),
            ..input()
        };
        input.sku = None;
        input.amount = None;
        let err = normalize_items(&mut input).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "items"));
    }

    #[test]
    fn test_non_positive_line_rejected() {
        let mut input = input();
        input.amount = Some(Decimal::ZERO);
        let err = normalize_items(&mut input).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "amount"));
    }
}
