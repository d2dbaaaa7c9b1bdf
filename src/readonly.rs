//! Read-only property stripping
//!
//! Collection is by property name only, with no path scoping: a name
//! flagged `readonly: true` anywhere in the schema is removed from every
//! object in the value, at any depth.

use serde_json::Value;
use std::collections::BTreeSet;

/// Names of every property flagged `readonly: true` in `schema`.
///
/// The name recorded is the key the flagged node sits under, so
/// `{"properties": {"id": {"readonly": true}}}` yields `id`.
pub fn collect_readonly(schema: &Value) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect(schema, &mut names);
    names
}

fn collect(node: &Value, names: &mut BTreeSet<String>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                if child.get("readonly") == Some(&Value::Bool(true)) {
                    names.insert(key.clone());
                }
                collect(child, names);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, names);
            }
        }
        _ => {}
    }
}

/// Remove every object key in `names` from `value`, at any depth
pub fn strip_readonly(value: &mut Value, names: &BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !names.contains(key));
            for child in map.values_mut() {
                strip_readonly(child, names);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                strip_readonly(item, names);
            }
        }
        _ => {}
    }
}

/// Collect from `schema` and strip from `value` in one go.
///
/// Returns the names that were looked for.
pub fn strip(schema: &Value, value: &mut Value) -> BTreeSet<String> {
    let names = collect_readonly(schema);
    if !names.is_empty() {
        strip_readonly(value, &names);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collect_nested_names() {
        let schema = json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "readonly": true },
                "name": { "type": "string" },
                "owner": {
                    "type": "object",
                    "properties": {
                        "createdAt": { "type": "string", "readonly": true },
                        "email": { "type": "string", "readonly": false }
                    }
                }
            }
        });
        let names = collect_readonly(&schema);
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["createdAt".to_string(), "id".to_string()]
        );
    }

    #[test]
    fn test_truthy_but_not_true_is_ignored() {
        let schema = json!({ "properties": { "id": { "readonly": "yes" } } });
        assert!(collect_readonly(&schema).is_empty());
    }

    #[test]
    fn test_strip_at_every_depth() {
        let names: BTreeSet<String> = ["id".to_string()].into_iter().collect();
        let mut value = json!({
            "id": 1,
            "name": "top",
            "children": [
                { "id": 2, "name": "a" },
                { "nested": { "id": 3, "keep": true } }
            ]
        });

        strip_readonly(&mut value, &names);

        assert_eq!(
            value,
            json!({
                "name": "top",
                "children": [
                    { "name": "a" },
                    { "nested": { "keep": true } }
                ]
            })
        );
    }

    #[test]
    fn test_name_is_not_path_scoped() {
        let schema = json!({
            "properties": {
                "audit": {
                    "properties": { "stamp": { "readonly": true } }
                },
                "stamp": { "type": "string" }
            }
        });
        let mut value = json!({ "audit": { "stamp": "x" }, "stamp": "y" });

        strip(&schema, &mut value);

        assert_eq!(value, json!({ "audit": {} }));
    }
}
