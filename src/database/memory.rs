use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::models::{ClinicalRecord, EntityKind, NewStaffAccount, StaffCredential};
use super::{CredentialStore, DatabaseError, RecordStore, StoreTransaction};
use crate::audit::{AuditEntry, NewAuditEntry};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: Vec<StaffCredential>,
    records: BTreeMap<i64, ClinicalRecord>,
    audit: Vec<AuditEntry>,
    next_record_id: i64,
    next_audit_id: i64,
}

/// In-process store for tests and database-less development.
///
/// A transaction holds the writer lock for its whole lifetime and works on a
/// private copy of the state, which replaces the shared state on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Vec<StaffCredential>) -> Self {
        let state = MemoryState {
            accounts,
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn create_account(&self, account: NewStaffAccount) -> Result<StaffCredential, DatabaseError> {
        let mut state = self.state.lock().await;
        if state.accounts.iter().any(|a| a.username == account.username) {
            return Err(DatabaseError::Conflict(format!(
                "account '{}' already exists",
                account.username
            )));
        }

        let id = state.accounts.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let created = StaffCredential {
            id,
            username: account.username,
            display_name: account.display_name,
            role: account.role,
            password_hash: account.password_hash,
            password_change_required: true,
            active: true,
        };
        state.accounts.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_credential(&self, username: &str) -> Result<Option<StaffCredential>, DatabaseError> {
        let state = self.state.lock().await;
        Ok(state.accounts.iter().find(|a| a.username == username).cloned())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn find_record(&self, kind: EntityKind, id: i64) -> Result<Option<ClinicalRecord>, DatabaseError> {
        let state = self.state.lock().await;
        Ok(state.records.get(&id).filter(|r| r.kind == kind).cloned())
    }

    async fn list_records(&self, kind: EntityKind) -> Result<Vec<ClinicalRecord>, DatabaseError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .values()
            .filter(|r| r.kind == kind && !r.deleted)
            .cloned()
            .collect())
    }

    async fn audit_history(&self, kind: EntityKind, id: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
        let state = self.state.lock().await;
        let mut rows: Vec<AuditEntry> = state
            .audit
            .iter()
            .filter(|e| e.entity_kind == kind && e.entity_id == id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_record(&mut self, kind: EntityKind, id: i64) -> Result<Option<ClinicalRecord>, DatabaseError> {
        Ok(self.working.records.get(&id).filter(|r| r.kind == kind).cloned())
    }

    async fn insert_record(
        &mut self,
        kind: EntityKind,
        fields: &Map<String, Value>,
        at: DateTime<Utc>,
    ) -> Result<ClinicalRecord, DatabaseError> {
        self.working.next_record_id += 1;
        let record = ClinicalRecord {
            id: self.working.next_record_id,
            kind,
            fields: fields.clone(),
            active: true,
            deleted: false,
            created_at: at,
            updated_at: at,
        };
        self.working.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_record(&mut self, record: &ClinicalRecord) -> Result<(), DatabaseError> {
        match self.working.records.get_mut(&record.id) {
            Some(stored) if stored.kind == record.kind => {
                *stored = record.clone();
                Ok(())
            }
            _ => Err(DatabaseError::QueryError(format!(
                "{} {} does not exist",
                record.kind, record.id
            ))),
        }
    }

    async fn latest_audit_at(&mut self, kind: EntityKind, id: i64) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        Ok(self
            .working
            .audit
            .iter()
            .filter(|e| e.entity_kind == kind && e.entity_id == id)
            .map(|e| e.created_at)
            .max())
    }

    async fn append_audit(&mut self, entries: &[NewAuditEntry]) -> Result<Vec<AuditEntry>, DatabaseError> {
        let mut stored = Vec::with_capacity(entries.len());
        for entry in entries {
            self.working.next_audit_id += 1;
            let row = entry.clone().stored(self.working.next_audit_id);
            self.working.audit.push(row.clone());
            stored.push(row);
        }
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
