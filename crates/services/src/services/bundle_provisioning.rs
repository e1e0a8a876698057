//! Adding categories to stored bundle templates.

use db::models::reminder_template::{BundleCategory, BundleConfig, ReminderTemplate};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    error::ServiceError,
    reminder_resolver::{InsertPosition, InvalidInput, merge_category},
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProvisionResult {
    pub template_id: Uuid,
    /// True when the category was already present; nothing was written.
    pub unchanged: bool,
    pub bundle: BundleConfig,
}

pub struct BundleProvisioningService;

impl BundleProvisioningService {
    /// Insert `category` into the template's bundle unless an equivalent one
    /// already exists. Re-running with the same category is a successful no-op.
    pub async fn add_category(
        pool: &SqlitePool,
        template_id: Uuid,
        category: BundleCategory,
        position: InsertPosition,
    ) -> Result<ProvisionResult, ServiceError> {
        let template = ReminderTemplate::find_by_id(pool, template_id)
            .await
            .map_err(ServiceError::persistence("load template", Some(template_id)))?
            .ok_or(InvalidInput::TemplateNotFound(template_id))?;

        if !template.is_bundle {
            return Err(InvalidInput::NotABundle(template_id).into());
        }

        let current = template
            .parsed_bundle()
            .map_err(|e| InvalidInput::MalformedBundle {
                template_id,
                reason: e.to_string(),
            })?;

        let key = category.dedup_key().to_string();
        let outcome = merge_category(&current, category, position);

        if outcome.unchanged {
            info!(template_id = %template_id, category = %key, "Bundle category already present");
        } else {
            ReminderTemplate::update_bundle_config(pool, template_id, &outcome.config)
                .await
                .map_err(ServiceError::persistence("update bundle config", Some(template_id)))?;
            info!(template_id = %template_id, category = %key, "Bundle category added");
        }

        Ok(ProvisionResult {
            template_id,
            unchanged: outcome.unchanged,
            bundle: outcome.config,
        })
    }
}
