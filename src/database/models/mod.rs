pub mod kind;
pub mod record;
pub mod staff;

pub use kind::EntityKind;
pub use record::{ClinicalRecord, RecordStatus};
pub use staff::{NewStaffAccount, StaffCredential};
