//! Status transitions for individual reminders.

use db::models::reminder::{Reminder, ReminderStatus};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{error::ServiceError, reminder_resolver::InvalidInput};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot move reminder from {from} to {to}")]
pub struct StatusTransitionError {
    pub from: ReminderStatus,
    pub to: ReminderStatus,
}

pub fn check_transition(from: ReminderStatus, to: ReminderStatus) -> Result<(), StatusTransitionError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StatusTransitionError { from, to })
    }
}

pub struct ReminderStatusService;

impl ReminderStatusService {
    /// Move a pending reminder to `done` or `dismissed`.
    pub async fn update_status(
        pool: &SqlitePool,
        reminder_id: Uuid,
        status: ReminderStatus,
    ) -> Result<Reminder, ServiceError> {
        let reminder = Reminder::find_by_id(pool, reminder_id)
            .await
            .map_err(ServiceError::persistence("load reminder", Some(reminder_id)))?
            .ok_or(InvalidInput::ReminderNotFound(reminder_id))?;

        check_transition(reminder.status, status).map_err(InvalidInput::from)?;

        let updated = Reminder::update_status(pool, reminder_id, status)
            .await
            .map_err(ServiceError::persistence("update reminder status", Some(reminder_id)))?
            .ok_or(InvalidInput::ReminderNotFound(reminder_id))?;

        info!(
            reminder_id = %reminder_id,
            from = %reminder.status,
            to = %status,
            "Reminder status updated"
        );
        Ok(updated)
    }
}
