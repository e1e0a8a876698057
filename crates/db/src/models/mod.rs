pub mod flock;
pub mod reminder;
pub mod reminder_template;
