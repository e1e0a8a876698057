use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Flock {
    pub id: Uuid,
    pub name: String,
    pub placement_date: NaiveDate, // Day 0, UTC calendar date
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateFlock {
    pub name: String,
    pub placement_date: NaiveDate,
}

/// Rows touched while detaching a flock from everything that references it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct FlockDependents {
    pub reminders: u64,
    pub vaccination_schedules: u64,
    pub health_records: u64,
    pub mortality_records: u64,
    pub sales_orders_unlinked: u64,
}

impl Flock {
    /// UTC calendar date of a placement timestamp. The time of day and the
    /// caller's offset are discarded.
    pub fn anchor_date<Tz: TimeZone>(placed_at: &DateTime<Tz>) -> NaiveDate {
        placed_at.with_timezone(&Utc).date_naive()
    }

    /// Whole days from placement to `date`; negative before placement.
    pub fn day_number(&self, date: NaiveDate) -> i64 {
        date.signed_duration_since(self.placement_date).num_days()
    }

    pub async fn create(pool: &SqlitePool, id: Uuid, data: &CreateFlock) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Flock>(
            r#"INSERT INTO flocks (id, name, placement_date)
               VALUES ($1, $2, $3)
               RETURNING id, name, placement_date, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(data.placement_date)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Flock>(
            r#"SELECT id, name, placement_date, created_at, updated_at
               FROM flocks
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Flock>(
            r#"SELECT id, name, placement_date, created_at, updated_at
               FROM flocks
               ORDER BY placement_date ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn update_placement_date<'e, E>(
        executor: E,
        id: Uuid,
        placement_date: NaiveDate,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"UPDATE flocks
               SET placement_date = $2,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(placement_date)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Remove or unlink every row that references the flock. Must run in the
    /// same transaction as [`Flock::delete`].
    pub async fn detach_dependents(
        conn: &mut sqlx::SqliteConnection,
        id: Uuid,
    ) -> Result<FlockDependents, sqlx::Error> {
        let reminders = super::reminder::Reminder::delete_by_flock_id(&mut *conn, id).await?;

        let vaccination_schedules =
            sqlx::query("DELETE FROM vaccination_schedules WHERE flock_id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await?
                .rows_affected();

        let health_records = sqlx::query("DELETE FROM health_records WHERE flock_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        let mortality_records = sqlx::query("DELETE FROM mortality_records WHERE flock_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        // Sales history outlives the flock.
        let sales_orders_unlinked =
            sqlx::query("UPDATE sales_orders SET flock_id = NULL WHERE flock_id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await?
                .rows_affected();

        Ok(FlockDependents {
            reminders,
            vaccination_schedules,
            health_records,
            mortality_records,
            sales_orders_unlinked,
        })
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM flocks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete vaccination schedules pointing at a flock that no longer exists.
    pub async fn delete_orphaned_vaccination_schedules(
        pool: &SqlitePool,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"DELETE FROM vaccination_schedules
               WHERE flock_id NOT IN (SELECT id FROM flocks)"#,
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
