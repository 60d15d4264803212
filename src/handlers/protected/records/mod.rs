// handlers/protected/records/mod.rs - Record CRUD under /api/records/:kind
//
// Which roles may call which method is decided by the access table before
// these handlers run. Every mutation is audited against the caller.

pub mod collection; // GET, POST /api/records/:kind
pub mod record; // GET, PATCH, DELETE /api/records/:kind/:id (+ activate/deactivate)

pub use collection::{collection_get, collection_post};
pub use record::{record_activate, record_deactivate, record_delete, record_get, record_patch};

use serde::Deserialize;

use crate::database::EntityKind;
use crate::error::ApiError;

/// Optional `?reason=` attached to status changes.
#[derive(Debug, Default, Deserialize)]
pub struct ReasonQuery {
    pub reason: Option<String>,
}

pub fn parse_kind(collection: &str) -> Result<EntityKind, ApiError> {
    EntityKind::from_collection(collection)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown record kind '{}'", collection)))
}

pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid record id '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_use_plural_collections() {
        assert_eq!(parse_kind("patients").unwrap(), EntityKind::Patient);
        assert!(parse_kind("patient").is_err());
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("12").unwrap(), 12);
        assert!(parse_id("0").is_err());
        assert!(parse_id("abc").is_err());
    }
}
