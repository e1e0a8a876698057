//! Startup check that the schema the reminder services rely on is present.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

/// Tables read or written by the reminder and flock services.
pub const REQUIRED_TABLES: &[&str] = &[
    "flocks",
    "reminder_templates",
    "reminders",
    "vaccination_schedules",
    "health_records",
    "mortality_records",
    "sales_orders",
];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check that migrations ran and every required table exists.
    pub async fn validate(&self) -> Result<ValidationResult, DatabaseValidationError> {
        let migrations_table_exists = self.table_exists("_sqlx_migrations").await?;

        if !migrations_table_exists {
            warn!("Database not initialized - _sqlx_migrations table does not exist");
            return Ok(ValidationResult {
                is_initialized: false,
                migrations_applied: 0,
                missing_tables: REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
            });
        }

        let migrations_applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        let missing_tables = self.validate_tables(REQUIRED_TABLES).await?;
        if !missing_tables.is_empty() {
            warn!(missing = ?missing_tables, "Required tables are missing");
        }

        info!(migrations_applied, "Database validation complete");

        Ok(ValidationResult {
            is_initialized: true,
            migrations_applied: migrations_applied as usize,
            missing_tables,
        })
    }

    /// Names from `required_tables` that do not exist.
    pub async fn validate_tables(
        &self,
        required_tables: &[&str],
    ) -> Result<Vec<String>, DatabaseValidationError> {
        let mut missing_tables = Vec::new();
        for table in required_tables {
            if !self.table_exists(table).await? {
                missing_tables.push(table.to_string());
            }
        }
        Ok(missing_tables)
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseValidationError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_initialized: bool,
    pub migrations_applied: usize,
    pub missing_tables: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.is_initialized && self.missing_tables.is_empty()
    }

    pub fn summary(&self) -> String {
        if !self.is_initialized {
            "Database not initialized - migrations need to be run".to_string()
        } else if !self.missing_tables.is_empty() {
            format!("Database is missing tables: {}", self.missing_tables.join(", "))
        } else {
            format!("Database OK - {} migrations applied", self.migrations_applied)
        }
    }
}
