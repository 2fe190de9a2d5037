//! Entity identifiers and the `id`/`_id` normalization boundary.
//!
//! Records coming back from the API may carry their identifier as `id`,
//! as the legacy `_id`, or both. Every record passes through
//! [`normalize_record`] before anything else sees it, so the rest of the
//! crate only ever reads `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ApiError;

/// Server-assigned identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Canonicalize a record's identifier into `id`, preferring `id` over `_id`.
pub fn normalize_record(mut record: Value) -> Result<Value, ApiError> {
    let obj = record
        .as_object_mut()
        .ok_or_else(|| ApiError::Decode("expected a JSON object".to_string()))?;

    let primary = obj.get("id").and_then(id_string);
    let legacy = obj.remove("_id").as_ref().and_then(id_string);
    let id = primary.or(legacy).ok_or(ApiError::MissingId)?;

    obj.insert("id".to_string(), Value::String(id));
    Ok(record)
}

/// Normalize a list response. Elements that are not objects, or that have
/// no identifier, are dropped.
pub fn normalize_collection(value: Value) -> Result<Vec<Value>, ApiError> {
    let Value::Array(items) = value else {
        return Err(ApiError::Decode("expected a JSON array".to_string()));
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match normalize_record(item) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(index, error = %e, "dropping unusable record"),
        }
    }
    Ok(records)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        // Mongo extended JSON
        Value::Object(map) => map.get("$oid").and_then(id_string),
        _ => None,
    }
}
