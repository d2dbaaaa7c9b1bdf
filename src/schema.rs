//! Schema model
//!
//! A schema descriptor arrives as loose JSON. It is normalized once at the
//! root (shorthand property maps become a full object schema) and then parsed
//! into a tree of [`SchemaNode`]s that the compiler walks.
//!
//! Parsing is lenient: keywords with the wrong shape are ignored, unknown
//! type names never match, and an uncompilable `pattern` never matches.
//! Nothing here returns an error.

use regex::Regex;
use serde_json::{Map, Value};

/// JSON value types a node can declare
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    /// `any`: matches every value
    Any,
    /// A name the dialect doesn't know; never matches
    Unknown(String),
}

impl JsonType {
    /// Parse a `type` keyword entry
    pub fn parse(name: &str) -> Self {
        match name {
            "object" => JsonType::Object,
            "array" => JsonType::Array,
            "string" => JsonType::String,
            "number" => JsonType::Number,
            "integer" => JsonType::Integer,
            "boolean" => JsonType::Boolean,
            "null" => JsonType::Null,
            "any" => JsonType::Any,
            other => JsonType::Unknown(other.to_string()),
        }
    }

    /// The type name as written in schemas and error messages
    pub fn name(&self) -> &str {
        match self {
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::Null => "null",
            JsonType::Any => "any",
            JsonType::Unknown(name) => name,
        }
    }

    /// Structural type check. No coercion: `"3"` is not a number.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            JsonType::Object => value.is_object(),
            JsonType::Array => value.is_array(),
            JsonType::String => value.is_string(),
            JsonType::Number => value.is_number(),
            JsonType::Integer => is_integer(value),
            JsonType::Boolean => value.is_boolean(),
            JsonType::Null => value.is_null(),
            JsonType::Any => true,
            JsonType::Unknown(_) => false,
        }
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => true,
        Value::Number(n) => n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false),
        _ => false,
    }
}

/// Node discriminator
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeKind {
    /// No `type` keyword
    #[default]
    Any,
    /// One or more declared types; a value must match at least one
    Typed(Vec<JsonType>),
}

impl NodeKind {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            NodeKind::Any => true,
            NodeKind::Typed(types) => types.iter().any(|t| t.matches(value)),
        }
    }

    /// Comma-joined declared type names, for messages
    pub fn type_names(&self) -> String {
        match self {
            NodeKind::Any => "any".to_string(),
            NodeKind::Typed(types) => types
                .iter()
                .map(JsonType::name)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    fn parse(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(name)) => NodeKind::Typed(vec![JsonType::parse(name)]),
            Some(Value::Array(names)) => NodeKind::Typed(
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(JsonType::parse)
                    .collect(),
            ),
            _ => NodeKind::Any,
        }
    }
}

/// What to do with object keys that are not declared in `properties`
#[derive(Debug, Clone, Default)]
pub enum AdditionalProperties {
    #[default]
    Allowed,
    Forbidden,
    /// Extra keys must validate against this node
    Schema(Box<SchemaNode>),
}

#[derive(Debug, Clone, Default)]
pub struct ObjectRules {
    /// Declared properties, in declaration order
    pub properties: Vec<(String, SchemaNode)>,
    /// Object-level `required: [..]` names
    pub required: Vec<String>,
    pub additional: AdditionalProperties,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    /// Whether `properties` appeared at all (even empty)
    pub declares_properties: bool,
}

impl ObjectRules {
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.property(name).is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArrayRules {
    pub items: Option<Box<SchemaNode>>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

/// Inline `pattern` keyword
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub source: String,
    /// `None` when the source didn't compile; such a rule never matches
    pub regex: Option<Regex>,
}

impl PatternRule {
    fn new(source: &str) -> Self {
        let regex = match Regex::new(source) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(pattern = source, error = %e, "schema pattern does not compile");
                None
            }
        };
        Self {
            source: source.to_string(),
            regex,
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        self.regex.as_ref().map(|re| re.is_match(value)).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StringRules {
    /// Format name, resolved against the registry at validation time
    pub format: Option<String>,
    pub pattern: Option<PatternRule>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct NumberRules {
    pub minimum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
}

/// One level of the schema tree
#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    pub kind: NodeKind,
    /// Property-level `required: true`
    pub required: bool,
    pub readonly: bool,
    pub enum_values: Option<Vec<Value>>,
    pub object: ObjectRules,
    pub array: ArrayRules,
    pub string: StringRules,
    pub number: NumberRules,
}

impl SchemaNode {
    /// Parse a node. Non-object input yields an unconstrained node.
    pub fn parse(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            kind: NodeKind::parse(obj.get("type")),
            required: obj.get("required").and_then(Value::as_bool).unwrap_or(false),
            readonly: obj.get("readonly").and_then(Value::as_bool).unwrap_or(false),
            enum_values: obj.get("enum").and_then(Value::as_array).cloned(),
            object: parse_object_rules(obj),
            array: parse_array_rules(obj),
            string: parse_string_rules(obj),
            number: parse_number_rules(obj),
        }
    }

    /// Format names referenced anywhere under this node
    pub fn formats(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_formats(&mut out);
        out
    }

    fn collect_formats<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(name) = &self.string.format {
            out.push(name);
        }
        for (_, child) in &self.object.properties {
            child.collect_formats(out);
        }
        if let AdditionalProperties::Schema(child) = &self.object.additional {
            child.collect_formats(out);
        }
        if let Some(items) = &self.array.items {
            items.collect_formats(out);
        }
    }
}

fn parse_object_rules(obj: &Map<String, Value>) -> ObjectRules {
    let properties_value = obj.get("properties").and_then(Value::as_object);

    let properties = properties_value
        .map(|props| {
            props
                .iter()
                .map(|(name, child)| (name.clone(), SchemaNode::parse(child)))
                .collect()
        })
        .unwrap_or_default();

    let required = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let additional = match obj.get("additionalProperties") {
        Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
        Some(schema @ Value::Object(_)) => {
            AdditionalProperties::Schema(Box::new(SchemaNode::parse(schema)))
        }
        _ => AdditionalProperties::Allowed,
    };

    ObjectRules {
        properties,
        required,
        additional,
        min_properties: count(obj.get("minProperties")),
        max_properties: count(obj.get("maxProperties")),
        declares_properties: properties_value.is_some(),
    }
}

fn parse_array_rules(obj: &Map<String, Value>) -> ArrayRules {
    ArrayRules {
        items: obj
            .get("items")
            .filter(|items| items.is_object())
            .map(|items| Box::new(SchemaNode::parse(items))),
        min_items: count(obj.get("minItems")),
        max_items: count(obj.get("maxItems")),
        unique_items: obj.get("uniqueItems").and_then(Value::as_bool).unwrap_or(false),
    }
}

fn parse_string_rules(obj: &Map<String, Value>) -> StringRules {
    StringRules {
        format: obj.get("format").and_then(Value::as_str).map(str::to_string),
        pattern: obj.get("pattern").and_then(Value::as_str).map(PatternRule::new),
        min_length: count(obj.get("minLength")),
        max_length: count(obj.get("maxLength")),
    }
}

fn parse_number_rules(obj: &Map<String, Value>) -> NumberRules {
    let mut rules = NumberRules {
        minimum: obj.get("minimum").and_then(Value::as_f64),
        maximum: obj.get("maximum").and_then(Value::as_f64),
        multiple_of: obj
            .get("multipleOf")
            .or_else(|| obj.get("divisibleBy"))
            .and_then(Value::as_f64),
        ..Default::default()
    };

    // Draft-4 boolean form tightens `minimum`/`maximum`; the numeric
    // form is its own bound.
    match obj.get("exclusiveMinimum") {
        Some(Value::Bool(true)) => rules.exclusive_minimum = rules.minimum.take(),
        Some(v) => rules.exclusive_minimum = v.as_f64(),
        None => {}
    }
    match obj.get("exclusiveMaximum") {
        Some(Value::Bool(true)) => rules.exclusive_maximum = rules.maximum.take(),
        Some(v) => rules.exclusive_maximum = v.as_f64(),
        None => {}
    }

    rules
}

fn count(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}

/// JavaScript-style truthiness, used for the shorthand check
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A normalized root schema
#[derive(Debug, Clone)]
pub struct Schema {
    /// `title` from the caller's descriptor, used to prefix root-level messages
    pub title: Option<String>,
    /// Root of the parsed tree
    pub root: SchemaNode,
    document: Value,
}

impl Schema {
    /// Normalize and parse a schema descriptor
    pub fn from_value(schema: &Value) -> Self {
        let document = Self::normalize(schema);
        let root = SchemaNode::parse(&document);
        Self {
            title: schema
                .get("title")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            root,
            document,
        }
    }

    /// Expand the shorthand form.
    ///
    /// A descriptor without a truthy `type` is taken as a bare property map
    /// and wrapped as `{type: object, required: true, additionalProperties:
    /// false, properties: <descriptor>}`. Only the root is rewritten.
    pub fn normalize(schema: &Value) -> Value {
        if schema.get("type").map(is_truthy).unwrap_or(false) {
            return schema.clone();
        }

        let mut wrapped = Map::new();
        wrapped.insert("type".to_string(), Value::String("object".to_string()));
        wrapped.insert("required".to_string(), Value::Bool(true));
        wrapped.insert("additionalProperties".to_string(), Value::Bool(false));
        wrapped.insert("properties".to_string(), schema.clone());
        Value::Object(wrapped)
    }

    /// The normalized descriptor the tree was parsed from
    pub fn document(&self) -> &Value {
        &self.document
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::from_value(&Value::Object(Map::new()))
    }
}
