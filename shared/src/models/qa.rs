//! QA checklist and inspection models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A reusable list of checks performed during inspection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaChecklist {
    pub id: Uuid,
    pub name: String,
    pub items: Vec<ChecklistItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecklistItem {
    pub label: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// Outcome of one checklist item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionResult {
    pub label: String,
    pub passed: bool,
    pub note: Option<String>,
}

/// A recorded inspection of a SKU (and optionally a batch) at a location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaInspection {
    pub id: Uuid,
    pub checklist_id: Uuid,
    pub sku: String,
    pub batch_id: Option<String>,
    pub location: String,
    pub inspector: String,
    pub results: Vec<InspectionResult>,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InspectionError {
    #[error("'{0}' is not on the checklist")]
    UnknownItem(String),

    #[error("required item '{0}' has no result")]
    MissingRequired(String),

    #[error("item '{0}' has more than one result")]
    DuplicateResult(String),
}

impl QaChecklist {
    /// Check results against this checklist and return whether the
    /// inspection passes (every required item present and passed).
    pub fn evaluate(&self, results: &[InspectionResult]) -> Result<bool, InspectionError> {
        for (idx, result) in results.iter().enumerate() {
            if !self.items.iter().any(|i| i.label == result.label) {
                return Err(InspectionError::UnknownItem(result.label.clone()));
            }
            if results[..idx].iter().any(|r| r.label == result.label) {
                return Err(InspectionError::DuplicateResult(result.label.clone()));
            }
        }

        let mut passed = true;
        for item in self.items.iter().filter(|i| i.required) {
            match results.iter().find(|r| r.label == item.label) {
                Some(r) => passed &= r.passed,
                None => return Err(InspectionError::MissingRequired(item.label.clone())),
            }
        }
        Ok(passed)
    }
}
