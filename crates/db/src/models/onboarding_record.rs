//! `onboarding_records` row model.

use std::collections::BTreeMap;

use bistro_core::error::CoreError;
use bistro_core::record::OnboardingRecord;
use bistro_core::slices::SliceSet;
use bistro_core::status::OnboardingStatus;
use bistro_core::types::{DbId, JsonMap, RecordId, Timestamp};
use serde_json::Value;
use sqlx::FromRow;

/// A row from the `onboarding_records` table.
#[derive(Debug, Clone, FromRow)]
pub struct OnboardingRecordRow {
    pub id: RecordId,
    pub owner_id: DbId,
    pub status: String,
    pub furthest_step: i16,
    pub restaurant_info: Value,
    pub contact: Value,
    pub business_data: Value,
    pub tech_setup: Value,
    pub tables: Value,
    pub menu: Value,
    pub agreement: Value,
    pub slice_versions: Value,
    pub submitted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn object(column: &str, value: Value) -> Result<JsonMap, CoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::Internal(format!(
            "Column '{column}' holds {other} instead of a JSON object"
        ))),
    }
}

impl TryFrom<OnboardingRecordRow> for OnboardingRecord {
    type Error = CoreError;

    fn try_from(row: OnboardingRecordRow) -> Result<Self, Self::Error> {
        let furthest_step = u8::try_from(row.furthest_step).map_err(|_| {
            CoreError::Internal(format!("furthest_step {} out of range", row.furthest_step))
        })?;
        let slice_versions: BTreeMap<String, i64> = serde_json::from_value(row.slice_versions)
            .map_err(|e| CoreError::Internal(format!("Invalid slice_versions: {e}")))?;

        Ok(OnboardingRecord {
            id: row.id,
            owner_id: row.owner_id,
            status: OnboardingStatus::from_str_db(&row.status)?,
            furthest_step,
            slices: SliceSet {
                restaurant_info: object("restaurant_info", row.restaurant_info)?,
                contact: object("contact", row.contact)?,
                business_data: object("business_data", row.business_data)?,
                tech_setup: object("tech_setup", row.tech_setup)?,
                tables: object("tables", row.tables)?,
                menu: object("menu", row.menu)?,
                agreement: object("agreement", row.agreement)?,
            },
            slice_versions,
            submitted_at: row.submitted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn row() -> OnboardingRecordRow {
        OnboardingRecordRow {
            id: uuid::Uuid::now_v7(),
            owner_id: 4,
            status: "draft".into(),
            furthest_step: 3,
            restaurant_info: json!({ "name": "Bella Napoli" }),
            contact: json!({}),
            business_data: json!({}),
            tech_setup: json!({}),
            tables: json!({}),
            menu: json!({}),
            agreement: json!({}),
            slice_versions: json!({ "restaurantInfo": 17 }),
            submitted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_record() {
        let record = OnboardingRecord::try_from(row()).unwrap();
        assert_eq!(record.status, OnboardingStatus::Draft);
        assert_eq!(record.furthest_step, 3);
        assert_eq!(record.slices.restaurant_info["name"], "Bella Napoli");
        assert_eq!(record.slice_versions["restaurantInfo"], 17);
    }

    #[test]
    fn non_object_slice_is_rejected() {
        let mut bad = row();
        bad.menu = json!(["not", "an", "object"]);
        assert!(OnboardingRecord::try_from(bad).is_err());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut bad = row();
        bad.status = "archived".into();
        assert!(OnboardingRecord::try_from(bad).is_err());
    }
}
