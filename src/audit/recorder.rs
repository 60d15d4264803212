use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use super::entry::{AuditEntry, AuditEventType, NewAuditEntry};
use super::snapshot::Snapshot;
use crate::auth::Principal;
use crate::database::models::{EntityKind, RecordStatus};
use crate::database::{DatabaseError, StoreTransaction};

#[derive(Debug, Error)]
pub enum AuditError {
    /// The enclosing transaction must be abandoned.
    #[error("Audit write failed: {0}")]
    WriteFailure(String),
}

impl From<DatabaseError> for AuditError {
    fn from(err: DatabaseError) -> Self {
        AuditError::WriteFailure(err.to_string())
    }
}

/// What happened to a record, as seen by the audit trail.
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
    Create {
        after: &'a Map<String, Value>,
    },
    Update {
        before: &'a Map<String, Value>,
        after: &'a Map<String, Value>,
    },
    Toggle {
        event: AuditEventType,
        from: RecordStatus,
        to: RecordStatus,
    },
}

impl Mutation<'_> {
    pub fn event_type(&self) -> AuditEventType {
        match self {
            Mutation::Create { .. } => AuditEventType::Create,
            Mutation::Update { .. } => AuditEventType::Update,
            Mutation::Toggle { event, .. } => *event,
        }
    }
}

/// Turns record mutations into audit rows and appends them inside the
/// mutation's own transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditTrailRecorder;

impl AuditTrailRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Build the rows for one mutation. Every row carries the same actor,
    /// reason and timestamp.
    pub fn plan(
        &self,
        kind: EntityKind,
        entity_id: i64,
        mutation: Mutation<'_>,
        actor: &Principal,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Vec<NewAuditEntry> {
        let event_type = mutation.event_type();
        let row = |field_name: Option<&str>, old_value: Option<&str>, new_value: Option<&str>| NewAuditEntry {
            entity_kind: kind,
            entity_id,
            event_type,
            field_name: field_name.map(str::to_owned),
            old_value: old_value.map(str::to_owned),
            new_value: new_value.map(str::to_owned),
            reason: reason.map(str::to_owned),
            actor_id: actor.subject_id,
            created_at: at,
        };

        match mutation {
            Mutation::Create { after } => {
                let after_view = Snapshot::of(kind, after);
                if after_view.is_empty() {
                    let whole = Value::Object(after.clone()).to_string();
                    return vec![row(None, None, Some(&whole))];
                }
                kind.tracked_fields()
                    .iter()
                    .filter_map(|field| {
                        let value = after_view.get(field)?;
                        Some(row(Some(*field), None, Some(value)))
                    })
                    .collect()
            }
            Mutation::Update { before, after } => {
                let old = Snapshot::of(kind, before);
                let new = Snapshot::of(kind, after);
                kind.tracked_fields()
                    .iter()
                    .filter(|field| old.get(field) != new.get(field))
                    .map(|field| row(Some(*field), old.get(field), new.get(field)))
                    .collect()
            }
            Mutation::Toggle { from, to, .. } => {
                vec![row(None, Some(from.as_str()), Some(to.as_str()))]
            }
        }
    }

    /// Timestamp for a new mutation, never earlier than the subject's most
    /// recent audit row so history stays ordered.
    pub async fn stamp(
        &self,
        tx: &mut dyn StoreTransaction,
        kind: EntityKind,
        entity_id: Option<i64>,
    ) -> Result<DateTime<Utc>, AuditError> {
        let now = Utc::now();
        let Some(id) = entity_id else {
            return Ok(now);
        };
        let latest = tx.latest_audit_at(kind, id).await?;
        Ok(latest.map_or(now, |latest| latest.max(now)))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        tx: &mut dyn StoreTransaction,
        kind: EntityKind,
        entity_id: i64,
        mutation: Mutation<'_>,
        actor: &Principal,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.plan(kind, entity_id, mutation, actor, reason, at);
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let stored = tx.append_audit(&entries).await.map_err(|e| {
            tracing::error!(
                entity_kind = %kind,
                entity_id,
                event_type = %mutation.event_type(),
                actor_id = actor.subject_id,
                "audit append failed: {}",
                e
            );
            AuditError::from(e)
        })?;

        tracing::debug!(
            entity_kind = %kind,
            entity_id,
            event_type = %mutation.event_type(),
            rows = stored.len(),
            "audit rows appended"
        );
        Ok(stored)
    }
}
