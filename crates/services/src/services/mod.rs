pub mod batch;
pub mod bundle_provisioning;
pub mod database_validator;
pub mod error;
pub mod flock_lifecycle;
pub mod reminder_generation;
pub mod reminder_repair;
pub mod reminder_resolver;
pub mod reminder_status;
