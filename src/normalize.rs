//! Error normalization
//!
//! Turns the engine's path-addressed records into the caller-facing shape:
//! deduplicated by `(message, field)`, with the root marker stripped off the
//! field path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Path marker for the validated value itself
pub const ROOT_FIELD: &str = "data";

/// A failure as produced by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawError {
    /// Dotted path, e.g. `data.address.zip` or `data.tags.1`
    pub field: String,
    /// Short English clause, e.g. `is required`
    pub message: String,
    /// Offending value, when the check has one worth reporting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl RawError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// A failure in the shape callers see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedError {
    /// Path below the root; absent for failures about the whole payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
    /// Original record, only in debug mode
    #[serde(rename = "_raw", default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawError>,
}

/// Deduplicate and reshape raw errors.
///
/// The first record for each `(message, field)` pair wins and engine order
/// is kept. `key` is everything after the first `.` in the field, so
/// `data.a.b` reports `key: "a.b"`. Root-level records get the schema title
/// (or `data`) prepended to the message instead.
pub fn normalize(raw: &[RawError], title: Option<&str>, debug: bool) -> Vec<NormalizedError> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    raw.iter()
        .filter(|err| seen.insert((err.message.as_str(), err.field.as_str())))
        .map(|err| {
            let key = err
                .field
                .split_once('.')
                .map(|(_, rest)| rest)
                .filter(|rest| !rest.is_empty());

            let (key, message) = match key {
                Some(key) => (Some(key.to_string()), err.message.clone()),
                None => {
                    let prefix = title.filter(|t| !t.is_empty()).unwrap_or(ROOT_FIELD);
                    (None, format!("{} {}", prefix, err.message))
                }
            };

            NormalizedError {
                key,
                message,
                raw: debug.then(|| err.clone()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_in_order() {
        let raw = vec![
            RawError::new("data.name", "is required"),
            RawError::new("data.age", "is not of a type(s) integer"),
            RawError::new("data.name", "is required"),
            RawError::new("data.age", "is less than minimum"),
        ];
        let errors = normalize(&raw, None, false);

        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].key.as_deref(), Some("name"));
        assert_eq!(errors[1].message, "is not of a type(s) integer");
        assert_eq!(errors[2].message, "is less than minimum");
    }

    #[test]
    fn test_partial_overlap_not_merged() {
        let raw = vec![
            RawError::new("data.a", "pattern mismatch"),
            RawError::new("data.b", "pattern mismatch"),
        ];
        assert_eq!(normalize(&raw, None, false).len(), 2);
    }

    #[test]
    fn test_root_error_prefix() {
        let raw = vec![RawError::new("data", "has additional properties")];

        let plain = normalize(&raw, None, false);
        assert_eq!(plain[0].key, None);
        assert_eq!(plain[0].message, "data has additional properties");

        let titled = normalize(&raw, Some("User"), false);
        assert_eq!(titled[0].message, "User has additional properties");
    }

    #[test]
    fn test_empty_title_falls_back_to_root() {
        let raw = vec![RawError::new("data", "is not of a type(s) object")];
        let errors = normalize(&raw, Some(""), false);
        assert_eq!(errors[0].message, "data is not of a type(s) object");
    }

    #[test]
    fn test_nested_key_keeps_remainder() {
        let raw = vec![RawError::new("data.address.zip", "is required")];
        let errors = normalize(&raw, Some("User"), false);
        assert_eq!(errors[0].key.as_deref(), Some("address.zip"));
        assert_eq!(errors[0].message, "is required");
    }

    #[test]
    fn test_trailing_dot_is_root() {
        let raw = vec![RawError::new("data.", "is required")];
        let errors = normalize(&raw, None, false);
        assert_eq!(errors[0].key, None);
    }

    #[test]
    fn test_debug_attaches_raw() {
        let raw = vec![RawError::new("data.id", "must be uuid format").with_value("x".into())];

        let quiet = normalize(&raw, None, false);
        assert!(quiet[0].raw.is_none());

        let loud = normalize(&raw, None, true);
        assert_eq!(loud[0].raw.as_ref(), Some(&raw[0]));

        let json = serde_json::to_value(&loud[0]).unwrap();
        assert_eq!(json["_raw"]["field"], "data.id");
        assert_eq!(json["_raw"]["value"], "x");
    }

    #[test]
    fn test_serialized_shape() {
        let raw = vec![
            RawError::new("data", "is not of a type(s) object"),
            RawError::new("data.name", "is required"),
        ];
        let json = serde_json::to_value(normalize(&raw, None, false)).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "message": "data is not of a type(s) object" },
                { "key": "name", "message": "is required" }
            ])
        );
    }
}
