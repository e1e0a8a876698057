//! Expansion of reminder templates into dated reminder instances, bundle
//! category provisioning, and title drift detection.
//!
//! Everything here is pure: no store access, no shared state. Persistence is
//! the caller's job.

use chrono::{Days, NaiveDate};
use db::models::{
    flock::Flock,
    reminder::{CreateReminder, Reminder, ReminderPriority},
    reminder_template::{BundleCategory, BundleConfig, BundleConfigError, ReminderTemplate},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::reminder_status::StatusTransitionError;

/// `Day <signed-int>:` at the start of a title. The literal word is matched
/// case-insensitively.
static DAY_TITLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i:day)\s+([+-]?\d+)\s*:").expect("valid day title regex"));

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("template {0} is inactive")]
    InactiveTemplate(Uuid),
    #[error("template {0} not found")]
    TemplateNotFound(Uuid),
    #[error("template {0} is not a bundle")]
    NotABundle(Uuid),
    #[error("template {0} has no day offset")]
    MissingDayOffset(Uuid),
    #[error("template {template_id} has a malformed bundle: {reason}")]
    MalformedBundle { template_id: Uuid, reason: String },
    #[error("flock {0} not found")]
    FlockNotFound(Uuid),
    #[error("reminder {0} not found")]
    ReminderNotFound(Uuid),
    #[error("day offset {offset} from {anchor} is out of range")]
    DueDateOutOfRange { anchor: NaiveDate, offset: i64 },
    #[error(transparent)]
    InvalidStatusTransition(#[from] StatusTransitionError),
}

/// A reminder ready to be persisted for a flock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ReminderInstance {
    pub flock_id: Uuid,
    pub template_id: Uuid,
    pub category: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub day_offset: i32,
    pub due_date: NaiveDate,
    pub priority: ReminderPriority,
}

impl ReminderInstance {
    /// `Day N: <title>`, computed from the offset instead of stored in the title.
    pub fn display_title(&self) -> String {
        format!("Day {}: {}", self.day_offset, self.title)
    }

    pub fn to_create(&self) -> CreateReminder {
        CreateReminder {
            flock_id: Some(self.flock_id),
            template_id: Some(self.template_id),
            day_offset: Some(self.day_offset),
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            priority: self.priority,
        }
    }
}

/// `anchor + offset` whole calendar days.
pub fn due_date_for(anchor: NaiveDate, offset: i32) -> Result<NaiveDate, InvalidInput> {
    let days = Days::new(u64::from(offset.unsigned_abs()));
    let due = if offset >= 0 {
        anchor.checked_add_days(days)
    } else {
        anchor.checked_sub_days(days)
    };
    due.ok_or(InvalidInput::DueDateOutOfRange {
        anchor,
        offset: i64::from(offset),
    })
}

/// Expand a template into reminder instances for `flock`, in category order
/// then reminder order. Disabled categories contribute nothing.
pub fn expand_template(
    template: &ReminderTemplate,
    flock: &Flock,
) -> Result<Vec<ReminderInstance>, InvalidInput> {
    if !template.is_active {
        return Err(InvalidInput::InactiveTemplate(template.id));
    }

    if !template.is_bundle {
        let offset = template
            .day_offset
            .ok_or(InvalidInput::MissingDayOffset(template.id))?;
        return Ok(vec![ReminderInstance {
            flock_id: flock.id,
            template_id: template.id,
            category: template.reminder_type.clone(),
            title: template.name.clone(),
            description: template.description.clone(),
            day_offset: offset,
            due_date: due_date_for(flock.placement_date, offset)?,
            priority: template.priority,
        }]);
    }

    let config = template
        .parsed_bundle()
        .map_err(|e| malformed(template.id, e))?;

    let mut instances = Vec::with_capacity(config.enabled_reminder_count());
    for category in config.categories().iter().filter(|c| c.enabled) {
        for reminder in &category.reminders {
            instances.push(ReminderInstance {
                flock_id: flock.id,
                template_id: template.id,
                category: Some(category.dedup_key().to_string()),
                title: reminder.name.clone(),
                description: Some(reminder.description.clone()).filter(|d| !d.is_empty()),
                day_offset: reminder.day_offset,
                due_date: due_date_for(flock.placement_date, reminder.day_offset)?,
                priority: reminder.priority,
            });
        }
    }
    Ok(instances)
}

fn malformed(template_id: Uuid, error: BundleConfigError) -> InvalidInput {
    InvalidInput::MalformedBundle {
        template_id,
        reason: error.to_string(),
    }
}

/// Where a newly provisioned category goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum InsertPosition {
    #[default]
    Prepend,
    Append,
    /// Clamped to the current length.
    At(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub config: BundleConfig,
    /// True when the category was already present and nothing changed.
    pub unchanged: bool,
}

/// Add `category` to a copy of `config` unless its key already matches an
/// existing category's key or name.
pub fn merge_category(
    config: &BundleConfig,
    category: BundleCategory,
    position: InsertPosition,
) -> MergeOutcome {
    if config.contains_key(category.dedup_key()) {
        return MergeOutcome {
            config: config.clone(),
            unchanged: true,
        };
    }

    let mut categories = config.categories().to_vec();
    let index = match position {
        InsertPosition::Prepend => 0,
        InsertPosition::Append => categories.len(),
        InsertPosition::At(index) => index.min(categories.len()),
    };
    categories.insert(index, category);

    MergeOutcome {
        config: BundleConfig(categories),
        unchanged: false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[strum(serialize = "no matching pattern")]
    NoMatchingPattern,
    #[strum(serialize = "flock not found")]
    FlockNotFound,
    #[strum(serialize = "already in sync")]
    InSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum RepairReason {
    #[strum(serialize = "drift")]
    Drift,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum RepairAction {
    Rename {
        new_title: String,
        title_day: i64,
        actual_day: i64,
        reason: RepairReason,
    },
    Skip {
        reason: SkipReason,
    },
}

impl RepairAction {
    fn skip(reason: SkipReason) -> Self {
        RepairAction::Skip { reason }
    }
}

/// Leading day number of a `Day N: ...` title.
pub fn title_day(title: &str) -> Option<i64> {
    DAY_TITLE_PATTERN
        .captures(title)
        .and_then(|caps| caps[1].parse().ok())
}

/// Compare the day number in a reminder's title with the day its due date
/// falls on relative to the flock's placement. On mismatch, produce a title
/// with only the number replaced.
pub fn reconcile_due_date_from_title(reminder: &Reminder, flock: Option<&Flock>) -> RepairAction {
    let Some(number) = DAY_TITLE_PATTERN
        .captures(&reminder.title)
        .and_then(|caps| caps.get(1))
    else {
        return RepairAction::skip(SkipReason::NoMatchingPattern);
    };
    let Ok(title_day) = number.as_str().parse::<i64>() else {
        return RepairAction::skip(SkipReason::NoMatchingPattern);
    };
    let Some(flock) = flock.filter(|f| reminder.flock_id == Some(f.id)) else {
        return RepairAction::skip(SkipReason::FlockNotFound);
    };

    let actual_day = flock.day_number(reminder.due_date);
    if actual_day == title_day {
        return RepairAction::skip(SkipReason::InSync);
    }

    let new_title = format!(
        "{}{}{}",
        &reminder.title[..number.start()],
        actual_day,
        &reminder.title[number.end()..]
    );

    RepairAction::Rename {
        new_title,
        title_day,
        actual_day,
        reason: RepairReason::Drift,
    }
}
