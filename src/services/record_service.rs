use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::audit::{AuditEntry, AuditError, AuditEventType, AuditTrailRecorder, Mutation, Snapshot};
use crate::auth::Principal;
use crate::database::models::{ClinicalRecord, EntityKind, RecordStatus};
use crate::database::{DatabaseError, RecordStore, StoreTransaction};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} {id} not found")]
    SubjectNotFound { kind: EntityKind, id: i64 },

    #[error("Unknown field '{field}' for {kind}")]
    UnknownField { kind: EntityKind, field: String },

    #[error("Field '{field}' must be a string, number, boolean or null")]
    InvalidValue { field: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Record CRUD where every mutation commits together with its audit rows.
pub struct RecordService {
    store: Arc<dyn RecordStore>,
    recorder: AuditTrailRecorder,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            recorder: AuditTrailRecorder::new(),
        }
    }

    pub async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.store.ping().await?)
    }

    pub async fn list(&self, kind: EntityKind) -> Result<Vec<ClinicalRecord>, ServiceError> {
        Ok(self.store.list_records(kind).await?)
    }

    pub async fn get(&self, kind: EntityKind, id: i64) -> Result<ClinicalRecord, ServiceError> {
        match self.store.find_record(kind, id).await? {
            Some(record) if !record.deleted => Ok(record),
            _ => Err(ServiceError::SubjectNotFound { kind, id }),
        }
    }

    pub async fn create(
        &self,
        kind: EntityKind,
        fields: Map<String, Value>,
        actor: &Principal,
    ) -> Result<ClinicalRecord, ServiceError> {
        validate_fields(kind, &fields)?;

        let mut tx = self.store.begin().await?;
        let at = self.recorder.stamp(tx.as_mut(), kind, None).await?;
        let record = tx.insert_record(kind, &fields, at).await?;
        self.recorder
            .record(
                tx.as_mut(),
                kind,
                record.id,
                Mutation::Create { after: &record.fields },
                actor,
                None,
                at,
            )
            .await?;
        tx.commit().await?;

        tracing::info!(entity_kind = %kind, entity_id = record.id, actor_id = actor.subject_id, "record created");
        Ok(record)
    }

    /// Apply a partial field map. A change that leaves every tracked field as
    /// it was writes nothing.
    pub async fn update(
        &self,
        kind: EntityKind,
        id: i64,
        changes: Map<String, Value>,
        reason: Option<&str>,
        actor: &Principal,
    ) -> Result<ClinicalRecord, ServiceError> {
        validate_fields(kind, &changes)?;

        let mut tx = self.store.begin().await?;
        let before = lock_live(tx.as_mut(), kind, id).await?;

        let mut after = before.clone();
        after.fields.extend(changes);
        if Snapshot::of(kind, &before.fields) == Snapshot::of(kind, &after.fields) {
            tracing::debug!(entity_kind = %kind, entity_id = id, "update changed no tracked field");
            return Ok(before);
        }

        let at = self.recorder.stamp(tx.as_mut(), kind, Some(id)).await?;
        after.updated_at = at;
        tx.update_record(&after).await?;
        let rows = self
            .recorder
            .record(
                tx.as_mut(),
                kind,
                id,
                Mutation::Update {
                    before: &before.fields,
                    after: &after.fields,
                },
                actor,
                reason,
                at,
            )
            .await?;
        tx.commit().await?;

        tracing::info!(
            entity_kind = %kind,
            entity_id = id,
            actor_id = actor.subject_id,
            changed_fields = rows.len(),
            "record updated"
        );
        Ok(after)
    }

    pub async fn set_active(
        &self,
        kind: EntityKind,
        id: i64,
        active: bool,
        reason: Option<&str>,
        actor: &Principal,
    ) -> Result<ClinicalRecord, ServiceError> {
        let mut tx = self.store.begin().await?;
        let before = lock_live(tx.as_mut(), kind, id).await?;
        if before.active == active {
            return Ok(before);
        }

        let event = if active {
            AuditEventType::Activate
        } else {
            AuditEventType::Deactivate
        };
        let mut after = before.clone();
        after.active = active;
        self.toggle(tx, before.status(), after, event, reason, actor).await
    }

    /// Soft delete. The record disappears from reads but keeps its history.
    pub async fn delete(
        &self,
        kind: EntityKind,
        id: i64,
        reason: Option<&str>,
        actor: &Principal,
    ) -> Result<ClinicalRecord, ServiceError> {
        let mut tx = self.store.begin().await?;
        let before = lock_live(tx.as_mut(), kind, id).await?;

        let mut after = before.clone();
        after.deleted = true;
        self.toggle(tx, before.status(), after, AuditEventType::Delete, reason, actor)
            .await
    }

    /// Audit rows for a record, most recent first. Deleted records keep
    /// their history.
    pub async fn history(&self, kind: EntityKind, id: i64) -> Result<Vec<AuditEntry>, ServiceError> {
        if self.store.find_record(kind, id).await?.is_none() {
            return Err(ServiceError::SubjectNotFound { kind, id });
        }
        Ok(self.store.audit_history(kind, id).await?)
    }

    async fn toggle(
        &self,
        mut tx: Box<dyn StoreTransaction>,
        from: RecordStatus,
        mut after: ClinicalRecord,
        event: AuditEventType,
        reason: Option<&str>,
        actor: &Principal,
    ) -> Result<ClinicalRecord, ServiceError> {
        let (kind, id) = (after.kind, after.id);
        let at = self.recorder.stamp(tx.as_mut(), kind, Some(id)).await?;
        after.updated_at = at;
        tx.update_record(&after).await?;
        self.recorder
            .record(
                tx.as_mut(),
                kind,
                id,
                Mutation::Toggle {
                    event,
                    from,
                    to: after.status(),
                },
                actor,
                reason,
                at,
            )
            .await?;
        tx.commit().await?;

        tracing::info!(entity_kind = %kind, entity_id = id, actor_id = actor.subject_id, event = %event, "record status changed");
        Ok(after)
    }
}

async fn lock_live(
    tx: &mut dyn StoreTransaction,
    kind: EntityKind,
    id: i64,
) -> Result<ClinicalRecord, ServiceError> {
    match tx.lock_record(kind, id).await? {
        Some(record) if !record.deleted => Ok(record),
        _ => Err(ServiceError::SubjectNotFound { kind, id }),
    }
}

fn validate_fields(kind: EntityKind, fields: &Map<String, Value>) -> Result<(), ServiceError> {
    for (name, value) in fields {
        if !kind.tracks(name) {
            return Err(ServiceError::UnknownField {
                kind,
                field: name.clone(),
            });
        }
        if value.is_array() || value.is_object() {
            return Err(ServiceError::InvalidValue { field: name.clone() });
        }
    }
    Ok(())
}
