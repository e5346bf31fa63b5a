/*!
 * Serde utilities for common serialization/deserialization patterns.
 *
 * This module provides reusable serde helper functions shared across the
 * configuration structs.
 */

use serde::{Deserialize, Deserializer};

/// Deserialize a key/value mapping table while preserving document order.
///
/// Mapping tables drive cache key construction, and later entries overwrite
/// earlier ones when they expand to the same cache key, so the order they were
/// written in is significant. A plain `HashMap` field would throw that order
/// away; this helper materializes the table as a pair list instead.
///
/// Two input shapes are accepted:
///
/// ```yaml
/// # Mapping form (the common case):
/// get:
///   "user:%{user_id}": "[user][profile]"
///   "plan:%{plan_id}": "[plan]"
///
/// # Pair list form:
/// get:
///   - ["user:%{user_id}", "[user][profile]"]
///   - ["plan:%{plan_id}", "[plan]"]
/// ```
///
/// # Usage with serde
///
/// ```rust
/// use serde::Deserialize;
/// use memcached_filter_core::utils::serde::deserialize_ordered_mappings;
///
/// #[derive(Deserialize)]
/// struct Config {
///     #[serde(default, deserialize_with = "deserialize_ordered_mappings")]
///     get: Vec<(String, String)>,
/// }
/// ```
pub fn deserialize_ordered_mappings<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_yaml::Value::deserialize(deserializer)?;
    match value {
        serde_yaml::Value::Null => Ok(Vec::new()),
        serde_yaml::Value::Mapping(mapping) => {
            let mut pairs = Vec::with_capacity(mapping.len());
            for (key, entry) in mapping {
                pairs.push((string_entry(key)?, string_entry(entry)?));
            }
            Ok(pairs)
        }
        serde_yaml::Value::Sequence(sequence) => {
            let mut pairs = Vec::with_capacity(sequence.len());
            for entry in sequence {
                match entry {
                    serde_yaml::Value::Sequence(pair) if pair.len() == 2 => {
                        let mut pair = pair.into_iter();
                        let key = pair.next().unwrap_or(serde_yaml::Value::Null);
                        let value = pair.next().unwrap_or(serde_yaml::Value::Null);
                        pairs.push((string_entry(key)?, string_entry(value)?));
                    }
                    other => {
                        return Err(D::Error::custom(format!(
                            "Expected a two-element [key, value] pair, found: {other:?}"
                        )))
                    }
                }
            }
            Ok(pairs)
        }
        other => Err(D::Error::custom(format!(
            "Expected a mapping or a list of pairs, found: {other:?}"
        ))),
    }
}

fn string_entry<E: serde::de::Error>(value: serde_yaml::Value) -> std::result::Result<String, E> {
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        other => Err(E::custom(format!(
            "Expected string mapping entry, found: {other:?}"
        ))),
    }
}
