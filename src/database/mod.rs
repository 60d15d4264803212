pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::audit::{AuditEntry, NewAuditEntry};

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use models::{ClinicalRecord, EntityKind, StaffCredential};
pub use postgres::PgStore;

/// Looks up login credentials by username.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_credential(&self, username: &str) -> Result<Option<StaffCredential>, DatabaseError>;
}

/// Read access to records and their history, plus transaction entry.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError>;

    async fn find_record(&self, kind: EntityKind, id: i64) -> Result<Option<ClinicalRecord>, DatabaseError>;

    /// Records of one kind that are not deleted, by id
    async fn list_records(&self, kind: EntityKind) -> Result<Vec<ClinicalRecord>, DatabaseError>;

    /// Audit rows for one subject, most recent first
    async fn audit_history(&self, kind: EntityKind, id: i64) -> Result<Vec<AuditEntry>, DatabaseError>;
}

/// One unit of work. Everything written through it commits together or is
/// discarded when it is dropped without `commit`.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Load a record and hold it against concurrent writers until the end
    /// of the transaction.
    async fn lock_record(&mut self, kind: EntityKind, id: i64) -> Result<Option<ClinicalRecord>, DatabaseError>;

    async fn insert_record(
        &mut self,
        kind: EntityKind,
        fields: &Map<String, Value>,
        at: DateTime<Utc>,
    ) -> Result<ClinicalRecord, DatabaseError>;

    async fn update_record(&mut self, record: &ClinicalRecord) -> Result<(), DatabaseError>;

    async fn latest_audit_at(&mut self, kind: EntityKind, id: i64) -> Result<Option<DateTime<Utc>>, DatabaseError>;

    async fn append_audit(&mut self, entries: &[NewAuditEntry]) -> Result<Vec<AuditEntry>, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;
}
