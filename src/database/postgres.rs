use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::models::{ClinicalRecord, EntityKind, NewStaffAccount, StaffCredential};
use super::manager::DatabaseManager;
use super::{CredentialStore, DatabaseError, RecordStore, StoreTransaction};
use crate::audit::{AuditEntry, NewAuditEntry};

const RECORD_COLUMNS: &str = "id, kind, data, active, deleted, created_at, updated_at";
const AUDIT_COLUMNS: &str =
    "id, entity_kind, entity_id, event_type, field_name, old_value, new_value, reason, actor_id, created_at";

#[derive(FromRow)]
struct StaffRow {
    id: i64,
    username: String,
    display_name: String,
    role: String,
    password_hash: String,
    password_change_required: bool,
    active: bool,
}

impl TryFrom<StaffRow> for StaffCredential {
    type Error = DatabaseError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        Ok(StaffCredential {
            id: row.id,
            role: row.role.parse().map_err(DatabaseError::Corrupt)?,
            username: row.username,
            display_name: row.display_name,
            password_hash: row.password_hash,
            password_change_required: row.password_change_required,
            active: row.active,
        })
    }
}

#[derive(FromRow)]
struct RecordRow {
    id: i64,
    kind: String,
    data: Json<Map<String, Value>>,
    active: bool,
    deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for ClinicalRecord {
    type Error = DatabaseError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(ClinicalRecord {
            id: row.id,
            kind: row.kind.parse().map_err(DatabaseError::Corrupt)?,
            fields: row.data.0,
            active: row.active,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AuditRow {
    id: i64,
    entity_kind: String,
    entity_id: i64,
    event_type: String,
    field_name: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    reason: Option<String>,
    actor_id: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = DatabaseError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditEntry {
            id: row.id,
            entity_kind: row.entity_kind.parse().map_err(DatabaseError::Corrupt)?,
            entity_id: row.entity_id,
            event_type: row.event_type.parse().map_err(DatabaseError::Corrupt)?,
            field_name: row.field_name,
            old_value: row.old_value,
            new_value: row.new_value,
            reason: row.reason,
            actor_id: row.actor_id,
            created_at: row.created_at,
        })
    }
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_account(&self, account: NewStaffAccount) -> Result<StaffCredential, DatabaseError> {
        let row = sqlx::query_as::<_, StaffRow>(
            "INSERT INTO staff_accounts (username, display_name, role, password_hash)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (username) DO NOTHING
             RETURNING id, username, display_name, role, password_hash, password_change_required, active",
        )
        .bind(&account.username)
        .bind(&account.display_name)
        .bind(account.role.as_str())
        .bind(&account.password_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(DatabaseError::Conflict(format!(
                "account '{}' already exists",
                account.username
            ))),
        }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_credential(&self, username: &str) -> Result<Option<StaffCredential>, DatabaseError> {
        sqlx::query_as::<_, StaffRow>(
            "SELECT id, username, display_name, role, password_hash, password_change_required, active
             FROM staff_accounts WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(StaffCredential::try_from)
        .transpose()
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn find_record(&self, kind: EntityKind, id: i64) -> Result<Option<ClinicalRecord>, DatabaseError> {
        let sql = format!("SELECT {} FROM clinical_records WHERE kind = $1 AND id = $2", RECORD_COLUMNS);
        sqlx::query_as::<_, RecordRow>(&sql)
            .bind(kind.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(ClinicalRecord::try_from)
            .transpose()
    }

    async fn list_records(&self, kind: EntityKind) -> Result<Vec<ClinicalRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM clinical_records WHERE kind = $1 AND NOT deleted ORDER BY id",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, RecordRow>(&sql)
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ClinicalRecord::try_from)
            .collect()
    }

    async fn audit_history(&self, kind: EntityKind, id: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM audit_entries
             WHERE entity_kind = $1 AND entity_id = $2
             ORDER BY created_at DESC, id DESC",
            AUDIT_COLUMNS
        );
        sqlx::query_as::<_, AuditRow>(&sql)
            .bind(kind.as_str())
            .bind(id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AuditEntry::try_from)
            .collect()
    }
}

struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn lock_record(&mut self, kind: EntityKind, id: i64) -> Result<Option<ClinicalRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM clinical_records WHERE kind = $1 AND id = $2 FOR UPDATE",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, RecordRow>(&sql)
            .bind(kind.as_str())
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(ClinicalRecord::try_from)
            .transpose()
    }

    async fn insert_record(
        &mut self,
        kind: EntityKind,
        fields: &Map<String, Value>,
        at: DateTime<Utc>,
    ) -> Result<ClinicalRecord, DatabaseError> {
        let sql = format!(
            "INSERT INTO clinical_records (kind, data, created_at, updated_at)
             VALUES ($1, $2, $3, $3)
             RETURNING {}",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, RecordRow>(&sql)
            .bind(kind.as_str())
            .bind(Json(fields))
            .bind(at)
            .fetch_one(&mut *self.tx)
            .await?
            .try_into()
    }

    async fn update_record(&mut self, record: &ClinicalRecord) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE clinical_records
             SET data = $3, active = $4, deleted = $5, updated_at = $6
             WHERE kind = $1 AND id = $2",
        )
        .bind(record.kind.as_str())
        .bind(record.id)
        .bind(Json(&record.fields))
        .bind(record.active)
        .bind(record.deleted)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(DatabaseError::QueryError(format!(
                "{} {} does not exist",
                record.kind, record.id
            )));
        }
        Ok(())
    }

    async fn latest_audit_at(&mut self, kind: EntityKind, id: i64) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT max(created_at) FROM audit_entries WHERE entity_kind = $1 AND entity_id = $2",
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(latest)
    }

    async fn append_audit(&mut self, entries: &[NewAuditEntry]) -> Result<Vec<AuditEntry>, DatabaseError> {
        let mut stored = Vec::with_capacity(entries.len());
        for entry in entries {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO audit_entries
                 (entity_kind, entity_id, event_type, field_name, old_value, new_value, reason, actor_id, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 RETURNING id",
            )
            .bind(entry.entity_kind.as_str())
            .bind(entry.entity_id)
            .bind(entry.event_type.as_str())
            .bind(&entry.field_name)
            .bind(&entry.old_value)
            .bind(&entry.new_value)
            .bind(&entry.reason)
            .bind(entry.actor_id)
            .bind(entry.created_at)
            .fetch_one(&mut *self.tx)
            .await?;
            stored.push(entry.clone().stored(id));
        }
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }
}
