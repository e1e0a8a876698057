//! Routes for flock-scoped reminder generation and flock lifecycle changes.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, post, put},
};
use chrono::NaiveDate;
use db::models::flock::FlockDependents;
use serde::{Deserialize, Serialize};
use services::services::{
    flock_lifecycle::{FlockLifecycleService, RescheduleResult},
    reminder_generation::{GenerationSummary, ReminderGenerationService},
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct GenerateRemindersRequest {
    /// Omit to apply every active template.
    pub template_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ReschedulePlacementRequest {
    pub placement_date: NaiveDate,
}

/// POST /api/flocks/{flock_id}/reminders/generate
pub async fn generate_reminders(
    State(state): State<AppState>,
    Path(flock_id): Path<Uuid>,
    axum::Json(payload): axum::Json<GenerateRemindersRequest>,
) -> Result<ResponseJson<ApiResponse<GenerationSummary>>, ApiError> {
    let service = ReminderGenerationService::new(state.db().clone());

    let summary = match payload.template_id {
        Some(template_id) => service.generate_for_flock(flock_id, template_id).await?,
        None => service.generate_all_for_flock(flock_id).await?,
    };

    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// PUT /api/flocks/{flock_id}/placement-date
pub async fn reschedule_placement(
    State(state): State<AppState>,
    Path(flock_id): Path<Uuid>,
    axum::Json(payload): axum::Json<ReschedulePlacementRequest>,
) -> Result<ResponseJson<ApiResponse<RescheduleResult>>, ApiError> {
    let result = FlockLifecycleService::reschedule_placement(
        &state.db().pool,
        flock_id,
        payload.placement_date,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

/// DELETE /api/flocks/{flock_id}
pub async fn delete_flock(
    State(state): State<AppState>,
    Path(flock_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<FlockDependents>>, ApiError> {
    let dependents = FlockLifecycleService::delete_flock(&state.db().pool, flock_id).await?;
    Ok(ResponseJson(ApiResponse::success(dependents)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/flocks/{flock_id}", delete(delete_flock))
        .route("/flocks/{flock_id}/reminders/generate", post(generate_reminders))
        .route("/flocks/{flock_id}/placement-date", put(reschedule_placement))
}
