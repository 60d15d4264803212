// Field-level change history written alongside each record mutation.

pub mod entry;
pub mod recorder;
pub mod snapshot;

pub use entry::{AuditEntry, AuditEventType, NewAuditEntry};
pub use recorder::{AuditError, AuditTrailRecorder, Mutation};
pub use snapshot::Snapshot;
