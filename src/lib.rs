//! Payload Schema
//!
//! Validates request-like JSON payloads against a compact, JSON-Schema-like
//! dialect and reports a short, deduplicated list of field-level errors.
//!
//! ## Features
//!
//! - **Shorthand Schemas**: A bare property map is treated as a closed object schema
//! - **Named Formats**: Built-in string formats (`mongo-object-id`, `uuid`, `hexcolor`, ...)
//!   plus caller-supplied ones
//! - **Simplified Errors**: `{key, message}` per field, deduplicated, in declaration order
//! - **Filtering**: Optionally prune undeclared keys before validating
//! - **Read-only Stripping**: Optionally remove `readonly` properties after a successful pass
//!
//! ## Flow
//!
//! ```text
//! validate(data, schema, options)
//!   ├── FormatRegistry::builtin().merged(options.formats)
//!   ├── compile(schema, formats)        shorthand normalization + node tree
//!   ├── [filter]  CompiledSchema::filter(data)
//!   ├── CompiledSchema::validate(..)    raw `data.<path>` records
//!   ├── invalid → normalize(..)         dedup + {key, message}
//!   └── valid   → [filter_readonly] readonly::strip(schema, data)
//! ```
//!
//! ## Example
//!
//! ```
//! use payload_schema::{validate, ValidateOptions};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "id": { "type": "string", "format": "mongo-object-id", "required": true }
//! });
//! let mut data = json!({ "id": "507f1f77bcf86cd799439011" });
//!
//! assert!(validate(&mut data, &schema, &ValidateOptions::default()).is_valid());
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod formats;
pub mod normalize;
pub mod readonly;
pub mod schema;

pub use compiler::{compile, CompiledSchema};
pub use config::ValidatorConfig;
pub use error::{Result, SchemaError};
pub use formats::{Format, FormatRegistry};
pub use normalize::{normalize, NormalizedError, RawError};
pub use schema::{NodeKind, Schema, SchemaNode};

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Extra formats layered over the built-in registry for this call
    pub formats: HashMap<String, Format>,
    /// Validate a copy of the data pruned to declared keys
    pub filter: bool,
    /// On success, remove read-only properties from the caller's data
    pub filter_readonly: bool,
    /// Attach the raw engine record to every error
    pub debug: bool,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, name: impl Into<String>, format: Format) -> Self {
        self.formats.insert(name.into(), format);
        self
    }

    pub fn filter(mut self, enabled: bool) -> Self {
        self.filter = enabled;
        self
    }

    pub fn filter_readonly(mut self, enabled: bool) -> Self {
        self.filter_readonly = enabled;
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }
}

/// Outcome of a validation call
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid,
    Invalid { errors: Vec<NormalizedError> },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Errors, empty when valid
    pub fn errors(&self) -> &[NormalizedError] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid { errors } => errors,
        }
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ValidationResult::Valid => {
                let mut state = serializer.serialize_struct("ValidationResult", 1)?;
                state.serialize_field("valid", &true)?;
                state.end()
            }
            ValidationResult::Invalid { errors } => {
                let mut state = serializer.serialize_struct("ValidationResult", 2)?;
                state.serialize_field("valid", &false)?;
                state.serialize_field("errors", errors)?;
                state.end()
            }
        }
    }
}

/// Validate `data` against `schema`.
///
/// `schema` may be a full schema (with a `type`) or a bare property map,
/// which is treated as a closed, required object. Pass `json!({})` for the
/// empty schema, which only accepts an empty object.
///
/// With `filter`, validation sees a pruned copy and `data` itself is not
/// pruned. With `filter_readonly`, a successful call removes read-only
/// properties from `data` in place. Nothing else touches `data`.
pub fn validate(data: &mut Value, schema: &Value, options: &ValidateOptions) -> ValidationResult {
    let merged;
    let formats = if options.formats.is_empty() {
        FormatRegistry::builtin()
    } else {
        merged = FormatRegistry::builtin().merged(&options.formats);
        &merged
    };

    let compiled = compile(schema, formats);

    let filtered;
    let target: &Value = if options.filter {
        filtered = compiled.filter(data);
        &filtered
    } else {
        &*data
    };

    let raw = compiled.validate(target);
    if !raw.is_empty() {
        let errors = normalize(&raw, compiled.schema().title.as_deref(), options.debug);
        tracing::debug!(raw = raw.len(), errors = errors.len(), "payload rejected");
        return ValidationResult::Invalid { errors };
    }

    if options.filter_readonly {
        let names = readonly::strip(compiled.schema().document(), data);
        tracing::debug!(readonly = names.len(), "stripped read-only properties");
    }

    ValidationResult::Valid
}
