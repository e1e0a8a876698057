use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::patch,
};
use db::models::reminder::{Reminder, ReminderStatus};
use serde::{Deserialize, Serialize};
use services::services::reminder_status::ReminderStatusService;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateReminderStatus {
    pub status: ReminderStatus,
}

/// PATCH /api/reminders/{reminder_id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(reminder_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateReminderStatus>,
) -> Result<ResponseJson<ApiResponse<Reminder>>, ApiError> {
    let reminder =
        ReminderStatusService::update_status(&state.db().pool, reminder_id, payload.status).await?;
    Ok(ResponseJson(ApiResponse::success(reminder)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/reminders/{reminder_id}/status", patch(update_status))
}
