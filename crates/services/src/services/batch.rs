//! Outcome accounting for batch jobs where every item is independent.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct BatchFailure {
    pub row_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Set when the batch stopped early; unprocessed items are not counted.
    pub cancelled: bool,
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, row_id: Uuid, error: impl ToString) {
        self.failed += 1;
        self.failures.push(BatchFailure {
            row_id,
            error: error.to_string(),
        });
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}
