use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::database::models::EntityKind;

/// Canonical string view of a record's tracked fields.
///
/// Null and absent fields are both missing from the view, so comparing two
/// snapshots is null-safe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    values: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn of(kind: EntityKind, fields: &Map<String, Value>) -> Self {
        let values = kind
            .tracked_fields()
            .iter()
            .filter_map(|name| {
                let value = canonical(fields.get(*name)?)?;
                Some((name.to_string(), value))
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Strings are kept verbatim, everything else uses its JSON text.
pub fn canonical(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
