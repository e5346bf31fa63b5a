//! # Record Collaborator
//!
//! The filter core operates on records flowing through the host pipeline.
//! [`Record`] is the seam the host implements; [`JsonRecord`] is the
//! JSON-backed implementation used by standalone pipelines and tests.
//!
//! Field locators use the bracket form `[outer][inner]` for nested access, or
//! a bare name for top-level fields. Key templates embed locators as
//! `%{locator}` placeholders, expanded per record by [`Record::sprintf`].

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Field holding the record's event time, stamped at construction
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Field holding the record's marker tags
pub const TAGS_FIELD: &str = "tags";

/// One structured unit of data flowing through the pipeline.
///
/// Implementations are owned by a single worker while being processed; the
/// filter core only ever sees one record at a time per worker.
pub trait Record {
    /// Read a possibly-nested field. Never creates containers along the path.
    fn get(&self, field_ref: &str) -> Option<Value>;

    /// Write a possibly-nested field, creating intermediate objects as
    /// needed. Numeric segments write into existing arrays in place; any
    /// other mismatched intermediate is replaced by an object.
    fn set(&mut self, field_ref: &str, value: Value);

    /// Append a marker to the `tags` collection.
    ///
    /// Creates the collection when absent, promotes a scalar `tags` value to
    /// an array first, and never appends a duplicate.
    fn tag(&mut self, tag: &str);

    /// Expand `%{field}` placeholders in a template against this record.
    ///
    /// A placeholder that does not resolve to a value is left in the output
    /// literally, unexpanded.
    fn sprintf(&self, template: &str) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("%{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let reference = &after[..end];
                    match self.get(reference) {
                        Some(value) if !value.is_null() => {
                            result.push_str(&render_value(&value));
                        }
                        _ => {
                            result.push_str("%{");
                            result.push_str(reference);
                            result.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }
}

/// String rendition of a field value for key construction.
///
/// Strings render verbatim; everything else renders as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write index for `segment` when the target is an existing array.
fn array_write_index(value: &Value, segment: &str) -> Option<usize> {
    match value {
        Value::Array(_) => segment.parse::<usize>().ok(),
        _ => None,
    }
}

/// Split a field locator into its path segments.
///
/// `[a][b]` yields `["a", "b"]`; a bare name yields itself as the only
/// segment.
fn split_field_path(field_ref: &str) -> Vec<&str> {
    if field_ref.starts_with('[') {
        field_ref
            .split(['[', ']'])
            .filter(|segment| !segment.is_empty())
            .collect()
    } else if field_ref.is_empty() {
        Vec::new()
    } else {
        vec![field_ref]
    }
}

/// JSON-backed record implementation
#[derive(Debug, Clone, Serialize)]
pub struct JsonRecord {
    fields: Map<String, Value>,
}

impl JsonRecord {
    /// Create an empty record stamped with the current time
    pub fn new() -> Self {
        Self::from_object(Map::new())
    }

    /// Create a record from an existing field map.
    ///
    /// Stamps [`TIMESTAMP_FIELD`] when the map does not already carry one.
    pub fn from_object(mut fields: Map<String, Value>) -> Self {
        fields.entry(TIMESTAMP_FIELD.to_string()).or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
        });
        Self { fields }
    }

    /// Borrow the underlying field map
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Default for JsonRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl Record for JsonRecord {
    fn get(&self, field_ref: &str) -> Option<Value> {
        let path = split_field_path(field_ref);
        let (first, rest) = path.split_first()?;
        let mut current = self.fields.get(*first)?;
        for segment in rest {
            current = match current {
                Value::Object(map) => map.get(*segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    fn set(&mut self, field_ref: &str, value: Value) {
        let path = split_field_path(field_ref);
        let Some((first, rest)) = path.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.fields.insert((*first).to_string(), value);
            return;
        }
        let Some((last, intermediate)) = rest.split_last() else {
            return;
        };
        let mut current = self
            .fields
            .entry((*first).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        for segment in intermediate {
            let index = array_write_index(current, segment);
            current = match (current, index) {
                (Value::Array(items), Some(index)) => {
                    if items.len() <= index {
                        items.resize(index + 1, Value::Null);
                    }
                    &mut items[index]
                }
                (slot, _) => {
                    if !slot.is_object() {
                        *slot = Value::Object(Map::new());
                    }
                    let Value::Object(map) = slot else { return };
                    map.entry((*segment).to_string())
                        .or_insert_with(|| Value::Object(Map::new()))
                }
            };
        }
        let index = array_write_index(current, last);
        match (current, index) {
            (Value::Array(items), Some(index)) => {
                if items.len() <= index {
                    items.resize(index + 1, Value::Null);
                }
                items[index] = value;
            }
            (slot, _) => {
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                let Value::Object(map) = slot else { return };
                map.insert((*last).to_string(), value);
            }
        }
    }

    fn tag(&mut self, tag: &str) {
        match self.fields.get_mut(TAGS_FIELD) {
            Some(Value::Array(tags)) => {
                if !tags.iter().any(|existing| existing.as_str() == Some(tag)) {
                    tags.push(Value::String(tag.to_string()));
                }
            }
            Some(Value::Null) | None => {
                self.fields.insert(
                    TAGS_FIELD.to_string(),
                    Value::Array(vec![Value::String(tag.to_string())]),
                );
            }
            Some(other) => {
                let mut tags = vec![other.clone()];
                if tags[0].as_str() != Some(tag) {
                    tags.push(Value::String(tag.to_string()));
                }
                *other = Value::Array(tags);
            }
        }
    }
}
