//! Record: a complete, schema-shaped result for one (satellite, topic) pair.
//!
//! A record always contains every field of its topic's schema (using the
//! `"NA"` sentinel where nothing was found) plus `satellite_name`. Extra
//! keys the agent volunteered are kept. Records are replaced wholesale in
//! storage, never merged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::Schema;

/// Sentinel for a field whose value could not be found or verified.
pub const UNKNOWN: &str = "NA";

/// Field carrying the entity key on every record.
pub const NAME_FIELD: &str = "satellite_name";

/// Optional field carrying a human-readable failure reason on fallback records.
pub const ERROR_FIELD: &str = "error";

/// Ordered field → value mapping for one satellite/topic pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// All-unknown record for a schema, fields in declared order.
    pub fn fallback(schema: &Schema) -> Self {
        let mut map = Map::new();
        for field in schema.fields {
            map.insert(field.name.to_string(), Value::String(UNKNOWN.to_string()));
        }
        Self(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.0.insert(field.to_string(), value);
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// True when the field is absent or still holds the `"NA"` sentinel.
    pub fn is_unknown(&self, field: &str) -> bool {
        match self.0.get(field) {
            Some(Value::String(s)) => s == UNKNOWN,
            Some(_) => false,
            None => true,
        }
    }

    /// Insert the sentinel for every schema field not yet present.
    pub fn fill_missing(&mut self, schema: &Schema) {
        for field in schema.fields {
            if !self.0.contains_key(field.name) {
                self.0
                    .insert(field.name.to_string(), Value::String(UNKNOWN.to_string()));
            }
        }
    }

    /// Stamp the entity key onto the record, overwriting if present.
    pub fn stamp_name(&mut self, satellite_name: &str) {
        self.0.insert(
            NAME_FIELD.to_string(),
            Value::String(satellite_name.to_string()),
        );
    }

    /// Attach a failure reason (used on fallback records only).
    pub fn with_error(mut self, reason: &str) -> Self {
        self.0
            .insert(ERROR_FIELD.to_string(), Value::String(reason.to_string()));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}
