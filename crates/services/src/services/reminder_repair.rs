//! Batch repair of `Day N: ...` titles that no longer match their due date.

use std::collections::HashMap;

use db::{
    DBService,
    models::{flock::Flock, reminder::Reminder},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    batch::BatchSummary,
    error::ServiceError,
    reminder_resolver::{RepairAction, reconcile_due_date_from_title},
};

pub struct ReminderRepairService {
    db: DBService,
}

impl ReminderRepairService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// Reconcile every reminder title against its flock. Each rename is its
    /// own single-row update, so a failed item leaves the rest untouched and
    /// the job can simply be re-run. With `dry_run` nothing is written and
    /// would-be renames count as succeeded.
    pub async fn repair_titles(
        &self,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, ServiceError> {
        let reminders = Reminder::find_all(&self.db.pool)
            .await
            .map_err(ServiceError::persistence("load reminders", None))?;

        info!(count = reminders.len(), dry_run, "Starting reminder title repair");

        let mut flocks: HashMap<Uuid, Option<Flock>> = HashMap::new();
        let mut batch = BatchSummary::default();

        for reminder in reminders {
            if cancel.is_cancelled() {
                info!(processed = batch.processed(), "Reminder title repair cancelled");
                batch.cancelled = true;
                break;
            }

            let flock = match self.cached_flock(&mut flocks, reminder.flock_id).await {
                Ok(flock) => flock,
                Err(e) => {
                    warn!(reminder_id = %reminder.id, error = %e, "Could not load flock");
                    batch.record_failure(reminder.id, e);
                    continue;
                }
            };

            match reconcile_due_date_from_title(&reminder, flock) {
                RepairAction::Skip { reason } => {
                    debug!(reminder_id = %reminder.id, %reason, "Skipping reminder");
                    batch.record_skip();
                }
                RepairAction::Rename { new_title, title_day, actual_day, .. } => {
                    info!(
                        reminder_id = %reminder.id,
                        old_title = %reminder.title,
                        new_title = %new_title,
                        title_day,
                        actual_day,
                        dry_run,
                        "Title drift detected"
                    );
                    if dry_run {
                        batch.record_success();
                        continue;
                    }
                    match Reminder::update_title(&self.db.pool, reminder.id, &new_title).await {
                        Ok(_) => batch.record_success(),
                        Err(e) => {
                            let e = ServiceError::persistence("update reminder title", Some(reminder.id))(e);
                            warn!(reminder_id = %reminder.id, error = %e, "Title repair failed");
                            batch.record_failure(reminder.id, e);
                        }
                    }
                }
            }
        }

        info!(
            succeeded = batch.succeeded,
            skipped = batch.skipped,
            failed = batch.failed,
            cancelled = batch.cancelled,
            "Reminder title repair finished"
        );
        Ok(batch)
    }

    async fn cached_flock<'a>(
        &self,
        cache: &'a mut HashMap<Uuid, Option<Flock>>,
        flock_id: Option<Uuid>,
    ) -> Result<Option<&'a Flock>, ServiceError> {
        let Some(flock_id) = flock_id else {
            return Ok(None);
        };
        if !cache.contains_key(&flock_id) {
            let flock = Flock::find_by_id(&self.db.pool, flock_id)
                .await
                .map_err(ServiceError::persistence("load flock", Some(flock_id)))?;
            cache.insert(flock_id, flock);
        }
        Ok(cache.get(&flock_id).and_then(Option::as_ref))
    }
}
