//! Batch repair jobs. Each runs to completion within the request unless the
//! server starts shutting down, in which case it stops between items.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use serde::{Deserialize, Serialize};
use services::services::{
    batch::BatchSummary,
    flock_lifecycle::{FlockLifecycleService, OrphanPurge},
    reminder_generation::ReminderGenerationService,
    reminder_repair::ReminderRepairService,
};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct RepairTitlesRequest {
    #[serde(default)]
    pub dry_run: bool,
}

/// POST /api/maintenance/repair-titles
pub async fn repair_titles(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<RepairTitlesRequest>,
) -> Result<ResponseJson<ApiResponse<BatchSummary>>, ApiError> {
    let summary = ReminderRepairService::new(state.db().clone())
        .repair_titles(payload.dry_run, state.shutdown())
        .await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// POST /api/maintenance/backfill-reminders
pub async fn backfill_reminders(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<BatchSummary>>, ApiError> {
    let summary = ReminderGenerationService::new(state.db().clone())
        .backfill(state.shutdown())
        .await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// POST /api/maintenance/purge-orphans
pub async fn purge_orphans(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<OrphanPurge>>, ApiError> {
    let purged = FlockLifecycleService::purge_orphans(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(purged)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/maintenance",
        Router::new()
            .route("/repair-titles", post(repair_titles))
            .route("/backfill-reminders", post(backfill_reminders))
            .route("/purge-orphans", post(purge_orphans)),
    )
}
