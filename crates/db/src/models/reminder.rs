use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::flock::Flock;

const REMINDER_COLUMNS: &str = "id, flock_id, template_id, day_offset, title, description, due_date, status, priority, created_at, updated_at";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "reminder_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReminderStatus {
    #[default]
    Pending,
    Done,
    Dismissed,
}

impl ReminderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReminderStatus::Done | ReminderStatus::Dismissed)
    }

    /// `pending -> {done, dismissed}`. Terminal states have no outgoing edges.
    pub fn can_transition_to(self, next: ReminderStatus) -> bool {
        matches!(
            (self, next),
            (ReminderStatus::Pending, ReminderStatus::Done)
                | (ReminderStatus::Pending, ReminderStatus::Dismissed)
        )
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Type,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sqlx(type_name = "reminder_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReminderPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A concrete reminder attached to (at most) one flock.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Reminder {
    pub id: Uuid,
    pub flock_id: Option<Uuid>, // None for standalone reminders
    pub template_id: Option<Uuid>,
    /// Offset from placement the reminder was generated for; None when added by hand.
    pub day_offset: Option<i32>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub status: ReminderStatus,
    pub priority: ReminderPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateReminder {
    pub flock_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub day_offset: Option<i32>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub priority: ReminderPriority,
}

impl Reminder {
    /// Title prefixed with the day number relative to the flock's placement.
    pub fn display_title(&self, flock: &Flock) -> String {
        format!("Day {}: {}", flock.day_number(self.due_date), self.title)
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateReminder,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Reminder>(&format!(
            r#"INSERT INTO reminders (id, flock_id, template_id, day_offset, title, description, due_date, priority)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {REMINDER_COLUMNS}"#
        ))
        .bind(id)
        .bind(data.flock_id)
        .bind(data.template_id)
        .bind(data.day_offset)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.due_date)
        .bind(data.priority)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Reminder>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_flock_id(
        pool: &SqlitePool,
        flock_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Reminder>(&format!(
            r#"SELECT {REMINDER_COLUMNS}
               FROM reminders
               WHERE flock_id = $1
               ORDER BY due_date ASC, created_at ASC"#
        ))
        .bind(flock_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Reminder>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders ORDER BY created_at ASC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Whether the flock already has this template reminder. Matched on the
    /// generating offset rather than the due date, which moves on reschedule
    /// for pending reminders only.
    pub async fn exists_for_template(
        pool: &SqlitePool,
        flock_id: Uuid,
        template_id: Uuid,
        title: &str,
        day_offset: i32,
    ) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*)
               FROM reminders
               WHERE flock_id = $1 AND template_id = $2 AND title = $3 AND day_offset = $4"#,
        )
        .bind(flock_id)
        .bind(template_id)
        .bind(title)
        .bind(day_offset)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn update_title(
        pool: &SqlitePool,
        id: Uuid,
        title: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE reminders
               SET title = $2,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(title)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: ReminderStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Reminder>(&format!(
            r#"UPDATE reminders
               SET status = $2,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {REMINDER_COLUMNS}"#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    /// Move every pending reminder of a flock by `days`. Done and dismissed
    /// reminders keep their historical due date.
    pub async fn shift_pending_due_dates<'e, E>(
        executor: E,
        flock_id: Uuid,
        days: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let modifier = format!("{days:+} days");
        let result = sqlx::query(
            r#"UPDATE reminders
               SET due_date = date(due_date, $2),
                   updated_at = datetime('now', 'subsec')
               WHERE flock_id = $1 AND status = 'pending'"#,
        )
        .bind(flock_id)
        .bind(modifier)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_flock_id<'e, E>(executor: E, flock_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM reminders WHERE flock_id = $1")
            .bind(flock_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete reminders whose flock no longer exists. Standalone reminders
    /// (no flock) are kept.
    pub async fn delete_orphaned(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"DELETE FROM reminders
               WHERE flock_id IS NOT NULL
                 AND flock_id NOT IN (SELECT id FROM flocks)"#,
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
