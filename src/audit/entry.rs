use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    Create,
    Update,
    Activate,
    Deactivate,
    Delete,
}

impl AuditEventType {
    pub const ALL: [AuditEventType; 5] = [
        AuditEventType::Create,
        AuditEventType::Update,
        AuditEventType::Activate,
        AuditEventType::Deactivate,
        AuditEventType::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::Create => "CREATE",
            AuditEventType::Update => "UPDATE",
            AuditEventType::Activate => "ACTIVATE",
            AuditEventType::Deactivate => "DEACTIVATE",
            AuditEventType::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("unknown audit event type '{}'", s))
    }
}

/// An audit row that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub entity_kind: EntityKind,
    pub entity_id: i64,
    pub event_type: AuditEventType,
    /// `None` for whole-record events
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub reason: Option<String>,
    pub actor_id: i64,
    pub created_at: DateTime<Utc>,
}

impl NewAuditEntry {
    pub fn stored(self, id: i64) -> AuditEntry {
        AuditEntry {
            id,
            entity_kind: self.entity_kind,
            entity_id: self.entity_id,
            event_type: self.event_type,
            field_name: self.field_name,
            old_value: self.old_value,
            new_value: self.new_value,
            reason: self.reason,
            actor_id: self.actor_id,
            created_at: self.created_at,
        }
    }
}

/// Immutable history row. Never updated or deleted once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub entity_kind: EntityKind,
    pub entity_id: i64,
    pub event_type: AuditEventType,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub reason: Option<String>,
    pub actor_id: i64,
    pub created_at: DateTime<Utc>,
}
