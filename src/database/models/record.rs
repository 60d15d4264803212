use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::kind::EntityKind;

/// Lifecycle state of a record, as shown in toggle audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Inactive,
    Deleted,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Inactive => "inactive",
            RecordStatus::Deleted => "deleted",
        }
    }
}

/// One stored clinical/administrative record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicalRecord {
    pub id: i64,
    pub kind: EntityKind,
    pub fields: Map<String, Value>,
    pub active: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClinicalRecord {
    pub fn status(&self) -> RecordStatus {
        match (self.deleted, self.active) {
            (true, _) => RecordStatus::Deleted,
            (false, true) => RecordStatus::Active,
            (false, false) => RecordStatus::Inactive,
        }
    }
}
