use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::post,
};
use db::models::reminder_template::BundleCategory;
use serde::{Deserialize, Serialize};
use services::services::{
    bundle_provisioning::{BundleProvisioningService, ProvisionResult},
    reminder_resolver::InsertPosition,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AddCategoryRequest {
    pub category: BundleCategory,
    #[serde(default)]
    pub position: InsertPosition,
}

/// POST /api/reminder-templates/{template_id}/categories
/// Re-posting an existing category succeeds with `unchanged: true`.
pub async fn add_category(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    axum::Json(payload): axum::Json<AddCategoryRequest>,
) -> Result<ResponseJson<ApiResponse<ProvisionResult>>, ApiError> {
    let result = BundleProvisioningService::add_category(
        &state.db().pool,
        template_id,
        payload.category,
        payload.position,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/reminder-templates/{template_id}/categories",
        post(add_category),
    )
}
