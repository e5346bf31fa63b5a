//! # Key Mapping
//!
//! Compiled pairings of cache-key templates and record field locators. The
//! tables are built once from configuration at registration time and never
//! mutated afterwards; per-record state lives in the expansion results, not
//! here.

use crate::record::Record;

/// One configured pairing of a cache-key template and a record field locator.
///
/// For lookups the field is the destination the fetched value lands in; for
/// stores it is the source the value is read from. Both directions share this
/// shape, normalized at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapping {
    template: String,
    field_path: String,
}

impl KeyMapping {
    pub fn new(template: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            field_path: field_path.into(),
        }
    }

    /// The raw, unexpanded key template
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The record field locator this mapping reads from or writes to
    pub fn field_path(&self) -> &str {
        &self.field_path
    }

    /// Expand the template against a record, producing a literal cache key
    pub fn expand(&self, record: &dyn Record) -> String {
        record.sprintf(&self.template)
    }
}

/// Compile lookup configuration pairs (key template, destination field)
pub fn compile_get_mappings(pairs: &[(String, String)]) -> Vec<KeyMapping> {
    pairs
        .iter()
        .map(|(template, field)| KeyMapping::new(template, field))
        .collect()
}

/// Compile store configuration pairs (source field, key template)
pub fn compile_set_mappings(pairs: &[(String, String)]) -> Vec<KeyMapping> {
    pairs
        .iter()
        .map(|(field, template)| KeyMapping::new(template, field))
        .collect()
}
