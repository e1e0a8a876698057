use axum::Router;

use crate::AppState;

pub mod flocks;
pub mod maintenance;
pub mod reminder_templates;
pub mod reminders;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(flocks::router(state))
        .merge(reminder_templates::router(state))
        .merge(reminders::router(state))
        .merge(maintenance::router(state))
}
