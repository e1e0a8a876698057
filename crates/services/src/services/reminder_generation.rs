//! Persist reminders expanded from templates, without duplicating rows that
//! already exist.

use db::{
    DBService,
    models::{
        flock::Flock,
        reminder::Reminder,
        reminder_template::ReminderTemplate,
    },
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    batch::{BatchFailure, BatchSummary},
    error::ServiceError,
    reminder_resolver::{InvalidInput, ReminderInstance, expand_template},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct GenerationSummary {
    pub created: usize,
    pub existing: usize,
    /// Templates that could not be expanded for the flock. Their reminders
    /// were not generated; the other templates' reminders were.
    pub template_failures: Vec<BatchFailure>,
}

impl std::ops::AddAssign for GenerationSummary {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.existing += other.existing;
        self.template_failures.extend(other.template_failures);
    }
}

pub struct ReminderGenerationService {
    db: DBService,
}

impl ReminderGenerationService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    fn pool(&self) -> &SqlitePool {
        &self.db.pool
    }

    /// Expand one template for one flock and insert the missing reminders.
    pub async fn generate_for_flock(
        &self,
        flock_id: Uuid,
        template_id: Uuid,
    ) -> Result<GenerationSummary, ServiceError> {
        let flock = self.load_flock(flock_id).await?;
        let template = ReminderTemplate::find_by_id(self.pool(), template_id)
            .await
            .map_err(ServiceError::persistence("load template", Some(template_id)))?
            .ok_or(InvalidInput::TemplateNotFound(template_id))?;

        let instances = expand_template(&template, &flock)?;
        let summary = self.persist_instances(&instances).await?;

        info!(
            flock_id = %flock_id,
            template_id = %template_id,
            created = summary.created,
            existing = summary.existing,
            "Generated reminders from template"
        );
        Ok(summary)
    }

    /// Apply every active template to a flock, typically right after placement.
    /// All templates are expanded before anything is written. A template that
    /// cannot be expanded is reported in `template_failures` and the rest are
    /// still applied.
    pub async fn generate_all_for_flock(
        &self,
        flock_id: Uuid,
    ) -> Result<GenerationSummary, ServiceError> {
        let flock = self.load_flock(flock_id).await?;
        let templates = ReminderTemplate::find_active(self.pool())
            .await
            .map_err(ServiceError::persistence("load active templates", None))?;

        let mut instances = Vec::new();
        let mut template_failures = Vec::new();
        for template in &templates {
            match expand_template(template, &flock) {
                Ok(expanded) => instances.extend(expanded),
                Err(e) => {
                    warn!(
                        flock_id = %flock_id,
                        template_id = %template.id,
                        error = %e,
                        "Template could not be expanded"
                    );
                    template_failures.push(BatchFailure {
                        row_id: template.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut summary = self.persist_instances(&instances).await?;
        summary.template_failures = template_failures;

        info!(
            flock_id = %flock_id,
            templates = templates.len(),
            created = summary.created,
            existing = summary.existing,
            template_failures = summary.template_failures.len(),
            "Generated reminders from all active templates"
        );
        Ok(summary)
    }

    /// Apply every active template to every flock. One flock failing does not
    /// stop the others. A flock counts as skipped when nothing new was created,
    /// and as failed when any template could not be expanded for it.
    pub async fn backfill(&self, cancel: &CancellationToken) -> Result<BatchSummary, ServiceError> {
        let flocks = Flock::find_all(self.pool())
            .await
            .map_err(ServiceError::persistence("load flocks", None))?;

        let mut batch = BatchSummary::default();
        for flock in flocks {
            if cancel.is_cancelled() {
                batch.cancelled = true;
                break;
            }

            match self.generate_all_for_flock(flock.id).await {
                Ok(summary) if !summary.template_failures.is_empty() => {
                    let templates: Vec<String> = summary
                        .template_failures
                        .iter()
                        .map(|f| format!("{}: {}", f.row_id, f.error))
                        .collect();
                    batch.record_failure(
                        flock.id,
                        format!("templates not applied: {}", templates.join("; ")),
                    );
                }
                Ok(summary) if summary.created == 0 => batch.record_skip(),
                Ok(_) => batch.record_success(),
                Err(e) => {
                    warn!(flock_id = %flock.id, error = %e, "Backfill failed for flock");
                    batch.record_failure(flock.id, e);
                }
            }
        }

        info!(
            succeeded = batch.succeeded,
            skipped = batch.skipped,
            failed = batch.failed,
            cancelled = batch.cancelled,
            "Reminder backfill finished"
        );
        Ok(batch)
    }

    async fn load_flock(&self, flock_id: Uuid) -> Result<Flock, ServiceError> {
        Ok(Flock::find_by_id(self.pool(), flock_id)
            .await
            .map_err(ServiceError::persistence("load flock", Some(flock_id)))?
            .ok_or(InvalidInput::FlockNotFound(flock_id))?)
    }

    /// Insert instances one row at a time, skipping ones already stored.
    async fn persist_instances(
        &self,
        instances: &[ReminderInstance],
    ) -> Result<GenerationSummary, ServiceError> {
        let mut summary = GenerationSummary::default();
        for instance in instances {
            let exists = Reminder::exists_for_template(
                self.pool(),
                instance.flock_id,
                instance.template_id,
                &instance.title,
                instance.day_offset,
            )
            .await
            .map_err(ServiceError::persistence("check existing reminder", Some(instance.flock_id)))?;

            if exists {
                debug!(
                    flock_id = %instance.flock_id,
                    template_id = %instance.template_id,
                    title = %instance.title,
                    day_offset = instance.day_offset,
                    "Reminder already exists, skipping"
                );
                summary.existing += 1;
                continue;
            }

            let id = Uuid::new_v4();
            Reminder::create(self.pool(), id, &instance.to_create())
                .await
                .map_err(ServiceError::persistence("insert reminder", Some(id)))?;
            summary.created += 1;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::models::{
        flock::CreateFlock,
        reminder::ReminderStatus,
        reminder_template::{BundleCategory, BundleConfig, BundleReminder, CreateReminderTemplate},
    };

    use crate::services::flock_lifecycle::FlockLifecycleService;

    use super::*;

    async fn setup() -> (ReminderGenerationService, Flock) {
        let db = DBService::new_in_memory().await.unwrap();
        let flock = Flock::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateFlock {
                name: "Shed 3".to_string(),
                placement_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            },
        )
        .await
        .unwrap();
        (ReminderGenerationService::new(db), flock)
    }

    fn preparation_bundle() -> BundleConfig {
        BundleConfig(vec![BundleCategory {
            category: Some("house_preparation".to_string()),
            name: "House Preparation".to_string(),
            enabled: true,
            reminders: vec![
                BundleReminder {
                    day_offset: -7,
                    name: "Wash down house".to_string(),
                    description: "Remove litter and disinfect".to_string(),
                    priority: Default::default(),
                },
                BundleReminder {
                    day_offset: -1,
                    name: "Pre-heat house".to_string(),
                    description: String::new(),
                    priority: Default::default(),
                },
            ],
        }])
    }

    #[tokio::test]
    async fn generation_is_idempotent() {
        let (service, flock) = setup().await;
        let template = ReminderTemplate::create(
            service.pool(),
            Uuid::new_v4(),
            &CreateReminderTemplate::bundle("Broiler setup", preparation_bundle()),
        )
        .await
        .unwrap();

        let first = service.generate_for_flock(flock.id, template.id).await.unwrap();
        let second = service.generate_for_flock(flock.id, template.id).await.unwrap();

        assert_eq!((first.created, first.existing), (2, 0));
        assert_eq!((second.created, second.existing), (0, 2));

        let stored = Reminder::find_by_flock_id(service.pool(), flock.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].title, "Wash down house");
        assert_eq!(stored[0].due_date, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(stored[1].due_date, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(stored[1].display_title(&flock), "Day -1: Pre-heat house");
    }

    #[tokio::test]
    async fn regenerating_after_reschedule_keeps_completed_reminders() {
        let (service, flock) = setup().await;
        let template = ReminderTemplate::create(
            service.pool(),
            Uuid::new_v4(),
            &CreateReminderTemplate::single("Clean house", -7),
        )
        .await
        .unwrap();

        service.generate_for_flock(flock.id, template.id).await.unwrap();
        let cleaned = Reminder::find_by_flock_id(service.pool(), flock.id).await.unwrap();
        Reminder::update_status(service.pool(), cleaned[0].id, ReminderStatus::Done)
            .await
            .unwrap();
        FlockLifecycleService::reschedule_placement(
            service.pool(),
            flock.id,
            NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
        )
        .await
        .unwrap();

        let again = service.generate_for_flock(flock.id, template.id).await.unwrap();

        assert_eq!((again.created, again.existing), (0, 1));
        let stored = Reminder::find_by_flock_id(service.pool(), flock.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, ReminderStatus::Done);
        assert_eq!(stored[0].due_date, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
    }

    #[tokio::test]
    async fn same_title_at_different_offsets_is_not_a_duplicate() {
        let (service, flock) = setup().await;
        let weighing = |day_offset| BundleReminder {
            day_offset,
            name: "Weigh birds".to_string(),
            description: String::new(),
            priority: Default::default(),
        };
        let template = ReminderTemplate::create(
            service.pool(),
            Uuid::new_v4(),
            &CreateReminderTemplate::bundle(
                "Weighing",
                BundleConfig(vec![BundleCategory {
                    category: Some("weighing".to_string()),
                    name: "Weighing".to_string(),
                    enabled: true,
                    reminders: vec![weighing(7), weighing(14)],
                }]),
            ),
        )
        .await
        .unwrap();

        let summary = service.generate_for_flock(flock.id, template.id).await.unwrap();

        assert_eq!((summary.created, summary.existing), (2, 0));
    }

    #[tokio::test]
    async fn broken_template_does_not_block_the_others() {
        let (service, flock) = setup().await;
        let good = ReminderTemplate::create(
            service.pool(),
            Uuid::new_v4(),
            &CreateReminderTemplate::single("Weigh birds", 7),
        )
        .await
        .unwrap();
        let broken = ReminderTemplate::create(
            service.pool(),
            Uuid::new_v4(),
            &CreateReminderTemplate::bundle("Broiler setup", preparation_bundle()),
        )
        .await
        .unwrap();
        sqlx::query("UPDATE reminder_templates SET bundle_config = 'not json' WHERE id = $1")
            .bind(broken.id)
            .execute(service.pool())
            .await
            .unwrap();

        let summary = service.generate_all_for_flock(flock.id).await.unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.template_failures.len(), 1);
        assert_eq!(summary.template_failures[0].row_id, broken.id);
        let stored = Reminder::find_by_flock_id(service.pool(), flock.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].template_id, Some(good.id));

        let cancel = CancellationToken::new();
        let batch = service.backfill(&cancel).await.unwrap();
        assert_eq!((batch.succeeded, batch.skipped, batch.failed), (0, 0, 1));
        assert_eq!(batch.failures[0].row_id, flock.id);
        assert!(batch.failures[0].error.contains(&broken.id.to_string()));
    }

    #[tokio::test]
    async fn inactive_template_is_rejected_without_writes() {
        let (service, flock) = setup().await;
        let template = ReminderTemplate::create(
            service.pool(),
            Uuid::new_v4(),
            &CreateReminderTemplate::single("Weigh birds", 7),
        )
        .await
        .unwrap();
        ReminderTemplate::set_active(service.pool(), template.id, false)
            .await
            .unwrap();

        let err = service.generate_for_flock(flock.id, template.id).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::InvalidInput(InvalidInput::InactiveTemplate(id)) if id == template.id
        ));
        assert!(Reminder::find_by_flock_id(service.pool(), flock.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_flock_is_invalid_input() {
        let (service, _) = setup().await;
        let template = ReminderTemplate::create(
            service.pool(),
            Uuid::new_v4(),
            &CreateReminderTemplate::single("Weigh birds", 7),
        )
        .await
        .unwrap();
        let missing = Uuid::new_v4();

        let err = service.generate_for_flock(missing, template.id).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::InvalidInput(InvalidInput::FlockNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn backfill_applies_all_active_templates() {
        let (service, flock) = setup().await;
        for (name, offset) in [("Weigh birds", 7), ("Second weigh", 14)] {
            ReminderTemplate::create(
                service.pool(),
                Uuid::new_v4(),
                &CreateReminderTemplate::single(name, offset),
            )
            .await
            .unwrap();
        }

        let cancel = CancellationToken::new();
        let first = service.backfill(&cancel).await.unwrap();
        let second = service.backfill(&cancel).await.unwrap();

        assert_eq!((first.succeeded, first.skipped, first.failed), (1, 0, 0));
        assert_eq!((second.succeeded, second.skipped, second.failed), (0, 1, 0));
        assert_eq!(
            Reminder::find_by_flock_id(service.pool(), flock.id).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn cancelled_backfill_does_nothing() {
        let (service, _) = setup().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = service.backfill(&cancel).await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed(), 0);
    }
}
