use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{error::ServiceError, reminder_resolver::InvalidInput};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::InvalidInput(invalid)) => match invalid {
                InvalidInput::FlockNotFound(_)
                | InvalidInput::TemplateNotFound(_)
                | InvalidInput::ReminderNotFound(_) => StatusCode::NOT_FOUND,
                InvalidInput::InvalidStatusTransition(_) => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::Service(ServiceError::PersistenceFailure { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}
