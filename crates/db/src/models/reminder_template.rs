use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::reminder::ReminderPriority;

const TEMPLATE_COLUMNS: &str = "id, name, description, reminder_type, is_bundle, day_offset, priority, bundle_config, is_active, created_at, updated_at";

#[derive(Debug, Error)]
pub enum BundleConfigError {
    #[error("malformed bundle json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate bundle category: {0}")]
    DuplicateCategory(String),
}

/// One offset-based reminder inside a bundle category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BundleReminder {
    pub day_offset: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: ReminderPriority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BundleCategory {
    /// Stable key. Older templates were authored without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub reminders: Vec<BundleReminder>,
}

fn default_enabled() -> bool {
    true
}

impl BundleCategory {
    /// The key used to detect an already-provisioned category.
    pub fn dedup_key(&self) -> &str {
        self.category.as_deref().unwrap_or(&self.name)
    }

    /// Matches on either the stable key or the display name, case-sensitively.
    pub fn matches_key(&self, key: &str) -> bool {
        self.category.as_deref() == Some(key) || self.name == key
    }
}

/// Ordered categories of a bundle template, stored as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(transparent)]
pub struct BundleConfig(pub Vec<BundleCategory>);

impl BundleConfig {
    pub fn categories(&self) -> &[BundleCategory] {
        &self.0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|c| c.matches_key(key))
    }

    /// Parse and validate a stored document.
    pub fn from_json(json: &str) -> Result<Self, BundleConfigError> {
        let config: BundleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, BundleConfigError> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    /// Category keys must be unique within one bundle.
    pub fn validate(&self) -> Result<(), BundleConfigError> {
        let mut seen = HashSet::new();
        for category in self.0.iter().filter_map(|c| c.category.as_deref()) {
            if !seen.insert(category) {
                return Err(BundleConfigError::DuplicateCategory(category.to_string()));
            }
        }
        Ok(())
    }

    /// Number of reminders a full expansion produces.
    pub fn enabled_reminder_count(&self) -> usize {
        self.0
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.reminders.len())
            .sum()
    }
}

/// A reusable reminder definition: either a single offset or a bundle.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ReminderTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub reminder_type: Option<String>,
    pub is_bundle: bool,
    pub day_offset: Option<i32>, // only meaningful when !is_bundle
    pub priority: ReminderPriority,
    pub bundle_config: Option<String>, // JSON-serialized BundleConfig
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReminderTemplate {
    /// Parse the stored bundle document. A bundle without a document is an
    /// empty bundle.
    pub fn parsed_bundle(&self) -> Result<BundleConfig, BundleConfigError> {
        match self.bundle_config.as_deref() {
            Some(json) => BundleConfig::from_json(json),
            None => Ok(BundleConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateReminderTemplate {
    pub name: String,
    pub description: Option<String>,
    pub reminder_type: Option<String>,
    pub day_offset: Option<i32>,
    pub priority: Option<ReminderPriority>,
    pub bundle: Option<BundleConfig>,
    pub is_active: Option<bool>,
}

impl CreateReminderTemplate {
    pub fn single(name: impl Into<String>, day_offset: i32) -> Self {
        Self {
            name: name.into(),
            description: None,
            reminder_type: None,
            day_offset: Some(day_offset),
            priority: None,
            bundle: None,
            is_active: None,
        }
    }

    pub fn bundle(name: impl Into<String>, config: BundleConfig) -> Self {
        Self {
            name: name.into(),
            description: None,
            reminder_type: None,
            day_offset: None,
            priority: None,
            bundle: Some(config),
            is_active: None,
        }
    }
}

impl ReminderTemplate {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateReminderTemplate,
    ) -> Result<Self, sqlx::Error> {
        let bundle_json = data
            .bundle
            .as_ref()
            .map(BundleConfig::to_json)
            .transpose()
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        let is_bundle = bundle_json.is_some();
        let priority = data.priority.unwrap_or_default();
        let is_active = data.is_active.unwrap_or(true);

        sqlx::query_as::<_, ReminderTemplate>(&format!(
            r#"INSERT INTO reminder_templates (id, name, description, reminder_type, is_bundle, day_offset, priority, bundle_config, is_active)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {TEMPLATE_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.reminder_type)
        .bind(is_bundle)
        .bind(data.day_offset)
        .bind(priority)
        .bind(bundle_json)
        .bind(is_active)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReminderTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM reminder_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReminderTemplate>(&format!(
            r#"SELECT {TEMPLATE_COLUMNS}
               FROM reminder_templates
               WHERE is_active = 1
               ORDER BY created_at ASC"#
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn update_bundle_config(
        pool: &SqlitePool,
        id: Uuid,
        config: &BundleConfig,
    ) -> Result<(), sqlx::Error> {
        let json = config
            .to_json()
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        sqlx::query(
            r#"UPDATE reminder_templates
               SET bundle_config = $2,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1 AND is_bundle = 1"#,
        )
        .bind(id)
        .bind(json)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_active(pool: &SqlitePool, id: Uuid, is_active: bool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE reminder_templates
               SET is_active = $2,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(is_active)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_bundle_document() {
        let json = r#"[
            {"category": "house_preparation", "name": "House Preparation", "enabled": true,
             "reminders": [
                {"dayOffset": -7, "name": "Clean house", "description": "Wash down", "priority": "high"},
                {"dayOffset": -1, "name": "Heat house", "description": "", "priority": "urgent"}
             ]},
            {"name": "Brooding", "enabled": false, "reminders": []}
        ]"#;

        let config = BundleConfig::from_json(json).unwrap();
        assert_eq!(config.categories().len(), 2);
        assert_eq!(config.categories()[0].reminders[0].day_offset, -7);
        assert_eq!(config.categories()[0].reminders[1].priority, ReminderPriority::Urgent);
        assert_eq!(config.categories()[1].dedup_key(), "Brooding");
        assert_eq!(config.enabled_reminder_count(), 2);
    }

    #[test]
    fn rejects_duplicate_category_keys() {
        let json = r#"[
            {"category": "vaccination", "name": "Vaccination", "enabled": true, "reminders": []},
            {"category": "vaccination", "name": "Vaccines", "enabled": true, "reminders": []}
        ]"#;
        assert!(matches!(
            BundleConfig::from_json(json),
            Err(BundleConfigError::DuplicateCategory(key)) if key == "vaccination"
        ));
    }

    #[test]
    fn rejects_non_array_documents() {
        assert!(matches!(
            BundleConfig::from_json(r#"{"category": "x"}"#),
            Err(BundleConfigError::Json(_))
        ));
    }

    #[test]
    fn matches_on_key_or_name() {
        let category = BundleCategory {
            category: Some("house_preparation".to_string()),
            name: "House Preparation".to_string(),
            enabled: true,
            reminders: vec![],
        };
        assert!(category.matches_key("house_preparation"));
        assert!(category.matches_key("House Preparation"));
        assert!(!category.matches_key("house preparation"));
    }
}
