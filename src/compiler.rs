//! Schema compiler and validation engine
//!
//! [`compile`] normalizes a descriptor and binds it to a format registry.
//! The resulting [`CompiledSchema`] offers two independent walks:
//!
//! - [`CompiledSchema::validate`] checks a value in lock-step with the schema
//!   tree and returns raw error records, depth-first in declaration order.
//! - [`CompiledSchema::filter`] returns a copy of a value pruned to the keys
//!   the schema declares.
//!
//! A type mismatch at a node stops the remaining checks for that node.

use serde_json::{Map, Value};

use crate::formats::FormatRegistry;
use crate::normalize::{RawError, ROOT_FIELD};
use crate::schema::{
    AdditionalProperties, ArrayRules, NumberRules, ObjectRules, Schema, SchemaNode, StringRules,
};

/// Allowed rounding drift for `multipleOf`, in ulps of the quotient
const MULTIPLE_OF_ULPS: f64 = 4.0;

/// A schema bound to the formats it will be checked with
#[derive(Debug)]
pub struct CompiledSchema<'r> {
    schema: Schema,
    formats: &'r FormatRegistry,
}

/// Compile a schema descriptor.
///
/// Never fails: unknown formats and broken patterns are logged and then
/// reject every string they are applied to.
pub fn compile<'r>(schema: &Value, formats: &'r FormatRegistry) -> CompiledSchema<'r> {
    let schema = Schema::from_value(schema);

    for name in schema.root.formats() {
        if !formats.contains(name) {
            tracing::warn!(format = name, "schema references an unregistered format");
        }
    }

    CompiledSchema { schema, formats }
}

impl<'r> CompiledSchema<'r> {
    /// The normalized schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validate a value, returning every violation found
    pub fn validate(&self, value: &Value) -> Vec<RawError> {
        let mut errors = Vec::new();
        self.check_node(&self.schema.root, value, ROOT_FIELD, &mut errors);
        errors
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_empty()
    }

    /// Copy `value` keeping only declared keys, recursively
    pub fn filter(&self, value: &Value) -> Value {
        filter_node(&self.schema.root, value)
    }

    fn check_node(
        &self,
        node: &SchemaNode,
        value: &Value,
        field: &str,
        errors: &mut Vec<RawError>,
    ) {
        if !node.kind.accepts(value) {
            errors.push(
                RawError::new(field, format!("is not of a type(s) {}", node.kind.type_names()))
                    .with_value(value.clone()),
            );
            return;
        }

        if let Some(allowed) = &node.enum_values {
            if !allowed.contains(value) {
                errors.push(
                    RawError::new(field, "must be an enum value").with_value(value.clone()),
                );
            }
        }

        match value {
            Value::Object(map) => self.check_object(&node.object, map, field, errors),
            Value::Array(items) => self.check_array(&node.array, items, field, errors),
            Value::String(s) => self.check_string(&node.string, s, field, errors),
            Value::Number(n) => {
                if let Some(n) = n.as_f64() {
                    check_number(&node.number, n, field, errors);
                }
            }
            Value::Bool(_) | Value::Null => {}
        }
    }

    fn check_object(
        &self,
        rules: &ObjectRules,
        map: &Map<String, Value>,
        field: &str,
        errors: &mut Vec<RawError>,
    ) {
        // Extras first, then declared properties in declaration order.
        for (key, value) in map {
            if rules.declares(key) {
                continue;
            }
            match &rules.additional {
                AdditionalProperties::Allowed => {}
                AdditionalProperties::Forbidden => {
                    errors.push(
                        RawError::new(field, "has additional properties")
                            .with_value(Value::String(child_path(field, key))),
                    );
                }
                AdditionalProperties::Schema(child) => {
                    self.check_node(child, value, &child_path(field, key), errors);
                }
            }
        }

        for (name, child) in &rules.properties {
            let path = child_path(field, name);
            match map.get(name) {
                Some(value) => self.check_node(child, value, &path, errors),
                None if child.required || rules.required.contains(name) => {
                    errors.push(RawError::new(path, "is required"));
                }
                None => {}
            }
        }

        for name in &rules.required {
            if !rules.declares(name) && !map.contains_key(name) {
                errors.push(RawError::new(child_path(field, name), "is required"));
            }
        }

        let len = map.len() as u64;
        if rules.min_properties.is_some_and(|min| len < min) {
            errors.push(RawError::new(field, "has less properties than allowed"));
        }
        if rules.max_properties.is_some_and(|max| len > max) {
            errors.push(RawError::new(field, "has more properties than allowed"));
        }
    }

    fn check_array(
        &self,
        rules: &ArrayRules,
        items: &[Value],
        field: &str,
        errors: &mut Vec<RawError>,
    ) {
        let len = items.len() as u64;
        if rules.min_items.is_some_and(|min| len < min) {
            errors.push(RawError::new(field, "has less items than allowed"));
        }
        if rules.max_items.is_some_and(|max| len > max) {
            errors.push(RawError::new(field, "has more items than allowed"));
        }

        if rules.unique_items && has_duplicates(items) {
            errors.push(RawError::new(field, "must be unique"));
        }

        if let Some(child) = &rules.items {
            for (i, item) in items.iter().enumerate() {
                self.check_node(child, item, &child_path(field, &i.to_string()), errors);
            }
        }
    }

    fn check_string(
        &self,
        rules: &StringRules,
        s: &str,
        field: &str,
        errors: &mut Vec<RawError>,
    ) {
        if let Some(name) = &rules.format {
            let ok = self
                .formats
                .resolve(name)
                .map(|format| format.matches(s))
                .unwrap_or(false);
            if !ok {
                errors.push(
                    RawError::new(field, format!("must be {} format", name))
                        .with_value(Value::String(s.to_string())),
                );
            }
        }

        if let Some(pattern) = &rules.pattern {
            if !pattern.matches(s) {
                errors.push(
                    RawError::new(field, "pattern mismatch")
                        .with_value(Value::String(s.to_string())),
                );
            }
        }

        let len = s.chars().count() as u64;
        if rules.min_length.is_some_and(|min| len < min) {
            errors.push(RawError::new(field, "has less length than allowed"));
        }
        if rules.max_length.is_some_and(|max| len > max) {
            errors.push(RawError::new(field, "has longer length than allowed"));
        }
    }
}

fn check_number(rules: &NumberRules, n: f64, field: &str, errors: &mut Vec<RawError>) {
    let below = rules.minimum.is_some_and(|min| n < min)
        || rules.exclusive_minimum.is_some_and(|min| n <= min);
    if below {
        errors.push(RawError::new(field, "is less than minimum").with_value(n.into()));
    }

    let above = rules.maximum.is_some_and(|max| n > max)
        || rules.exclusive_maximum.is_some_and(|max| n >= max);
    if above {
        errors.push(RawError::new(field, "is more than maximum").with_value(n.into()));
    }

    if let Some(step) = rules.multiple_of.filter(|step| *step > 0.0) {
        let quotient = n / step;
        let drift = (quotient - quotient.round()).abs();
        if drift > quotient.abs() * MULTIPLE_OF_ULPS * f64::EPSILON {
            errors.push(RawError::new(field, "has a remainder").with_value(n.into()));
        }
    }
}

fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, a)| items[i + 1..].iter().any(|b| a == b))
}

fn child_path(field: &str, name: &str) -> String {
    format!("{}.{}", field, name)
}

/// Prune at object nodes that declare `properties` or forbid extras.
/// Free-form object nodes pass through unchanged.
fn filter_node(node: &SchemaNode, value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let rules = &node.object;
            let prune = rules.declares_properties
                || matches!(rules.additional, AdditionalProperties::Forbidden);

            let mut out = Map::new();
            for (key, child_value) in map {
                match (rules.property(key), &rules.additional) {
                    (Some(child), _) => {
                        out.insert(key.clone(), filter_node(child, child_value));
                    }
                    (None, _) if prune => {}
                    (None, AdditionalProperties::Schema(child)) => {
                        out.insert(key.clone(), filter_node(child, child_value));
                    }
                    (None, _) => {
                        out.insert(key.clone(), child_value.clone());
                    }
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => match &node.array.items {
            Some(child) => {
                Value::Array(items.iter().map(|item| filter_node(child, item)).collect())
            }
            None => value.clone(),
        },
        _ => value.clone(),
    }
}
