//! HTTP handlers for QA checklists and inspections

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{QaChecklist, QaInspection};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::qa::{CreateChecklistInput, RecordInspectionInput};
use crate::store::InspectionFilter;
use crate::AppState;

pub async fn create_checklist(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateChecklistInput>,
) -> AppResult<(StatusCode, Json<QaChecklist>)> {
    check_permission(&current_user.0, "qa", "write")?;
    let checklist = state.services.qa.create_checklist(input).await?;
    Ok((StatusCode::CREATED, Json(checklist)))
}

pub async fn list_checklists(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<QaChecklist>>> {
    check_permission(&current_user.0, "qa", "read")?;
    Ok(Json(state.services.qa.list_checklists().await?))
}

pub async fn get_checklist(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<QaChecklist>> {
    check_permission(&current_user.0, "qa", "read")?;
    Ok(Json(state.services.qa.get_checklist(id).await?))
}

pub async fn record_inspection(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordInspectionInput>,
) -> AppResult<(StatusCode, Json<QaInspection>)> {
    check_permission(&current_user.0, "qa", "write")?;
    let inspection = state
        .services
        .qa
        .record_inspection(input, &current_user.0.username)
        .await?;
    Ok((StatusCode::CREATED, Json(inspection)))
}

/// Inspections, newest first, optionally by SKU and/or batch
pub async fn list_inspections(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<InspectionFilter>,
) -> AppResult<Json<Vec<QaInspection>>> {
    check_permission(&current_user.0, "qa", "read")?;
    Ok(Json(state.services.qa.list_inspections(filter).await?))
}
