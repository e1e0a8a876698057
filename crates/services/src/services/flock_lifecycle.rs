//! Flock changes that have to keep dependent rows consistent.

use chrono::NaiveDate;
use db::models::{
    flock::{Flock, FlockDependents},
    reminder::Reminder,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{error::ServiceError, reminder_resolver::InvalidInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct RescheduleResult {
    pub flock_id: Uuid,
    pub shifted_by_days: i64,
    pub reminders_shifted: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct OrphanPurge {
    pub reminders: u64,
    pub vaccination_schedules: u64,
}

pub struct FlockLifecycleService;

impl FlockLifecycleService {
    /// Delete a flock together with everything that references it. All of it
    /// happens in one transaction; any failure rolls the whole delete back.
    pub async fn delete_flock(
        pool: &SqlitePool,
        flock_id: Uuid,
    ) -> Result<FlockDependents, ServiceError> {
        let mut tx = pool
            .begin()
            .await
            .map_err(ServiceError::persistence("begin flock delete", Some(flock_id)))?;

        let dependents = Flock::detach_dependents(&mut tx, flock_id)
            .await
            .map_err(ServiceError::persistence("detach flock dependents", Some(flock_id)))?;

        let deleted = Flock::delete(&mut *tx, flock_id)
            .await
            .map_err(ServiceError::persistence("delete flock", Some(flock_id)))?;
        if deleted == 0 {
            // Dropping the transaction rolls back the dependent deletes.
            return Err(InvalidInput::FlockNotFound(flock_id).into());
        }

        tx.commit()
            .await
            .map_err(ServiceError::persistence("commit flock delete", Some(flock_id)))?;

        info!(
            flock_id = %flock_id,
            reminders = dependents.reminders,
            vaccination_schedules = dependents.vaccination_schedules,
            health_records = dependents.health_records,
            mortality_records = dependents.mortality_records,
            sales_orders_unlinked = dependents.sales_orders_unlinked,
            "Flock deleted"
        );
        Ok(dependents)
    }

    /// Change a flock's placement date and move its pending reminders by the
    /// same number of days, so their day numbers stay put.
    pub async fn reschedule_placement(
        pool: &SqlitePool,
        flock_id: Uuid,
        placement_date: NaiveDate,
    ) -> Result<RescheduleResult, ServiceError> {
        let flock = Flock::find_by_id(pool, flock_id)
            .await
            .map_err(ServiceError::persistence("load flock", Some(flock_id)))?
            .ok_or(InvalidInput::FlockNotFound(flock_id))?;

        let delta = placement_date
            .signed_duration_since(flock.placement_date)
            .num_days();

        let mut tx = pool
            .begin()
            .await
            .map_err(ServiceError::persistence("begin reschedule", Some(flock_id)))?;

        Flock::update_placement_date(&mut *tx, flock_id, placement_date)
            .await
            .map_err(ServiceError::persistence("update placement date", Some(flock_id)))?;

        let reminders_shifted = if delta == 0 {
            0
        } else {
            Reminder::shift_pending_due_dates(&mut *tx, flock_id, delta)
                .await
                .map_err(ServiceError::persistence("shift reminder due dates", Some(flock_id)))?
        };

        tx.commit()
            .await
            .map_err(ServiceError::persistence("commit reschedule", Some(flock_id)))?;

        info!(
            flock_id = %flock_id,
            from = %flock.placement_date,
            to = %placement_date,
            reminders_shifted,
            "Flock placement rescheduled"
        );
        Ok(RescheduleResult {
            flock_id,
            shifted_by_days: delta,
            reminders_shifted,
        })
    }

    /// Remove rows left behind by flocks deleted outside [`Self::delete_flock`].
    pub async fn purge_orphans(pool: &SqlitePool) -> Result<OrphanPurge, ServiceError> {
        let reminders = Reminder::delete_orphaned(pool)
            .await
            .map_err(ServiceError::persistence("delete orphaned reminders", None))?;
        let vaccination_schedules = Flock::delete_orphaned_vaccination_schedules(pool)
            .await
            .map_err(ServiceError::persistence("delete orphaned vaccination schedules", None))?;

        info!(reminders, vaccination_schedules, "Orphaned rows purged");
        Ok(OrphanPurge {
            reminders,
            vaccination_schedules,
        })
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            flock::CreateFlock,
            reminder::{CreateReminder, ReminderPriority, ReminderStatus},
        },
    };

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn flock(db: &DBService) -> Flock {
        Flock::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateFlock {
                name: "Shed 2".to_string(),
                placement_date: date(2024, 3, 10),
            },
        )
        .await
        .unwrap()
    }

    async fn reminder(db: &DBService, flock_id: Uuid, title: &str, due: NaiveDate) -> Reminder {
        Reminder::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateReminder {
                flock_id: Some(flock_id),
                template_id: None,
                day_offset: None,
                title: title.to_string(),
                description: None,
                due_date: due,
                priority: ReminderPriority::Normal,
            },
        )
        .await
        .unwrap()
    }

    async fn count(db: &DBService, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql).fetch_one(&db.pool).await.unwrap()
    }

    #[tokio::test]
    async fn delete_removes_dependents_and_unlinks_sales() {
        let db = DBService::new_in_memory().await.unwrap();
        let flock = flock(&db).await;
        reminder(&db, flock.id, "Weigh", date(2024, 3, 17)).await;
        sqlx::query("INSERT INTO vaccination_schedules (id, flock_id, vaccine_name, day_offset) VALUES ($1, $2, 'IB', 1)")
            .bind(Uuid::new_v4())
            .bind(flock.id)
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO mortality_records (id, flock_id, recorded_on, count) VALUES ($1, $2, '2024-03-12', 3)")
            .bind(Uuid::new_v4())
            .bind(flock.id)
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO sales_orders (id, flock_id, customer) VALUES ($1, $2, 'Processor')")
            .bind(Uuid::new_v4())
            .bind(flock.id)
            .execute(&db.pool)
            .await
            .unwrap();

        let dependents = FlockLifecycleService::delete_flock(&db.pool, flock.id).await.unwrap();

        assert_eq!(
            dependents,
            FlockDependents {
                reminders: 1,
                vaccination_schedules: 1,
                health_records: 0,
                mortality_records: 1,
                sales_orders_unlinked: 1,
            }
        );
        assert!(Flock::find_by_id(&db.pool, flock.id).await.unwrap().is_none());
        assert_eq!(count(&db, "SELECT COUNT(*) FROM sales_orders WHERE flock_id IS NULL").await, 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM reminders").await, 0);
    }

    #[tokio::test]
    async fn deleting_unknown_flock_rolls_back() {
        let db = DBService::new_in_memory().await.unwrap();
        let missing = Uuid::new_v4();

        let err = FlockLifecycleService::delete_flock(&db.pool, missing).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::InvalidInput(InvalidInput::FlockNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn failed_flock_delete_keeps_dependents() {
        let db = DBService::new_in_memory().await.unwrap();
        let flock = flock(&db).await;
        reminder(&db, flock.id, "Weigh", date(2024, 3, 17)).await;
        sqlx::query(
            r#"CREATE TRIGGER keep_flocks
               BEFORE DELETE ON flocks
               BEGIN
                   SELECT RAISE(ABORT, 'flock is locked');
               END"#,
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let err = FlockLifecycleService::delete_flock(&db.pool, flock.id).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::PersistenceFailure { operation: "delete flock", row_id: Some(id), .. }
                if id == flock.id
        ));
        assert!(Flock::find_by_id(&db.pool, flock.id).await.unwrap().is_some());
        assert_eq!(Reminder::find_by_flock_id(&db.pool, flock.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reschedule_shifts_only_pending_reminders() {
        let db = DBService::new_in_memory().await.unwrap();
        let flock = flock(&db).await;
        let pending = reminder(&db, flock.id, "Weigh", date(2024, 3, 17)).await;
        let done = reminder(&db, flock.id, "Clean", date(2024, 3, 3)).await;
        Reminder::update_status(&db.pool, done.id, ReminderStatus::Done).await.unwrap();

        let result = FlockLifecycleService::reschedule_placement(&db.pool, flock.id, date(2024, 3, 12))
            .await
            .unwrap();

        assert_eq!(result.shifted_by_days, 2);
        assert_eq!(result.reminders_shifted, 1);
        let moved = Reminder::find_by_id(&db.pool, pending.id).await.unwrap().unwrap();
        assert_eq!(moved.due_date, date(2024, 3, 19));
        let kept = Reminder::find_by_id(&db.pool, done.id).await.unwrap().unwrap();
        assert_eq!(kept.due_date, date(2024, 3, 3));

        let flock = Flock::find_by_id(&db.pool, flock.id).await.unwrap().unwrap();
        assert_eq!(flock.placement_date, date(2024, 3, 12));
        assert_eq!(flock.day_number(moved.due_date), 7);
    }

    #[tokio::test]
    async fn purge_removes_rows_of_missing_flocks() {
        let db = DBService::new_in_memory().await.unwrap();
        let flock = flock(&db).await;
        reminder(&db, flock.id, "Kept", date(2024, 3, 17)).await;

        // Legacy data written without foreign key enforcement.
        sqlx::query("PRAGMA foreign_keys = OFF").execute(&db.pool).await.unwrap();
        reminder(&db, Uuid::new_v4(), "Orphan", date(2024, 3, 17)).await;
        sqlx::query("INSERT INTO vaccination_schedules (id, flock_id, vaccine_name, day_offset) VALUES ($1, $2, 'ND', 10)")
            .bind(Uuid::new_v4())
            .bind(Uuid::new_v4())
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON").execute(&db.pool).await.unwrap();

        let purged = FlockLifecycleService::purge_orphans(&db.pool).await.unwrap();

        assert_eq!(
            purged,
            OrphanPurge {
                reminders: 1,
                vaccination_schedules: 1,
            }
        );
        assert_eq!(Reminder::find_by_flock_id(&db.pool, flock.id).await.unwrap().len(), 1);
    }
}
