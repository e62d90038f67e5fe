//! QA checklists and inspections

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use shared::{
    validate_batch_id, validate_location, validate_sku, ChecklistItem, InspectionResult,
    LedgerEvent, QaChecklist, QaInspection,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ChangeFeed;
use crate::store::{InspectionFilter, QaRepository};

#[derive(Clone)]
pub struct QaService {
    repo: Arc<dyn QaRepository>,
    feed: ChangeFeed,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChecklistInput {
    #[validate(length(min = 1, max = 200, message = "Checklist name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "A checklist needs at least one item"))]
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Deserialize)]
pub struct RecordInspectionInput {
    pub checklist_id: Uuid,
    pub sku: String,
    pub batch_id: Option<String>,
    pub location: String,
    pub results: Vec<InspectionResult>,
}

impl QaService {
    pub fn new(repo: Arc<dyn QaRepository>, feed: ChangeFeed) -> Self {
        Self { repo, feed }
    }

    pub async fn create_checklist(&self, input: CreateChecklistInput) -> AppResult<QaChecklist> {
        input.validate()?;

        let mut seen = HashSet::new();
        for item in &input.items {
            if item.label.trim().is_empty() {
                return Err(AppError::validation("items", "Checklist item labels cannot be empty"));
            }
            if !seen.insert(item.label.as_str()) {
                return Err(AppError::validation(
                    "items",
                    format!("Duplicate checklist item '{}'", item.label),
                ));
            }
        }

        let checklist = QaChecklist {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            items: input.items,
            created_at: Utc::now(),
        };
        self.repo.insert_checklist(&checklist).await?;

        tracing::info!(checklist_id = %checklist.id, name = %checklist.name, "QA checklist created");
        self.feed.publish(LedgerEvent::ChecklistCreated { id: checklist.id });
        Ok(checklist)
    }

    pub async fn get_checklist(&self, id: Uuid) -> AppResult<QaChecklist> {
        self.repo
            .get_checklist(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Checklist {}", id)))
    }

    pub async fn list_checklists(&self) -> AppResult<Vec<QaChecklist>> {
        self.repo.list_checklists().await
    }

    pub async fn record_inspection(
        &self,
        input: RecordInspectionInput,
        inspector: &str,
    ) -> AppResult<QaInspection> {
        let sku = input.sku.trim().to_uppercase();
        validate_sku(&sku).map_err(|m| AppError::validation("sku", m))?;
        validate_location(&input.location).map_err(|m| AppError::validation("location", m))?;
        if let Some(batch_id) = &input.batch_id {
            validate_batch_id(batch_id).map_err(|m| AppError::validation("batch_id", m))?;
        }

        let checklist = self.get_checklist(input.checklist_id).await?;
        let passed = checklist.evaluate(&input.results)?;

        let inspection = QaInspection {
            id: Uuid::new_v4(),
            checklist_id: checklist.id,
            sku,
            batch_id: input.batch_id,
            location: input.location,
            inspector: inspector.to_string(),
            results: input.results,
            passed,
            timestamp: Utc::now(),
        };
        self.repo.insert_inspection(&inspection).await?;

        if !passed {
            tracing::warn!(
                inspection_id = %inspection.id,
                sku = %inspection.sku,
                batch_id = ?inspection.batch_id,
                "QA inspection failed"
            );
        }
        self.feed.publish(LedgerEvent::InspectionRecorded {
            id: inspection.id,
            checklist_id: inspection.checklist_id,
            sku: inspection.sku.clone(),
            passed,
        });
        Ok(inspection)
    }

    pub async fn list_inspections(&self, filter: InspectionFilter) -> AppResult<Vec<QaInspection>> {
        self.repo.list_inspections(&filter).await
    }
}
