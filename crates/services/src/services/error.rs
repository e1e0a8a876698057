//! Errors shared by the store-backed reminder services.

use thiserror::Error;
use uuid::Uuid;

use super::reminder_resolver::InvalidInput;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("persistence failure during {operation} (row {row_id:?}): {source}")]
    PersistenceFailure {
        operation: &'static str,
        row_id: Option<Uuid>,
        #[source]
        source: sqlx::Error,
    },
}

impl ServiceError {
    /// Adapter for `map_err` that tags a store error with what was being done.
    pub(crate) fn persistence(
        operation: &'static str,
        row_id: Option<Uuid>,
    ) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| ServiceError::PersistenceFailure {
            operation,
            row_id,
            source,
        }
    }
}
