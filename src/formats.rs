//! Format registry
//!
//! Named string-shape validators referenced by the `format` keyword.
//! The built-in table is process-wide and never mutated; callers that
//! supply their own formats get a fresh merged registry for that call.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::net::Ipv6Addr;
use std::sync::{Arc, LazyLock};

use crate::error::{Result, SchemaError};

/// Formats the wrapped JSON validator ships with. The request-payload
/// table below is layered on top of these.
const STANDARD_PATTERNS: &[(&str, &str)] = &[
    (
        "date-time",
        r"^[0-9]{4}-(?:0[0-9]|1[0-2])-[0-9]{2}[tT ][0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?([zZ]|[+-][0-9]{2}:[0-9]{2})$",
    ),
    ("date", r"^[0-9]{4}-(?:0[0-9]|1[0-2])-[0-9]{2}$"),
    ("time", r"^[0-9]{2}:[0-9]{2}:[0-9]{2}$"),
    ("email", r"^\S+@\S+$"),
    (
        "ipv4",
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
    ),
    ("uri", r"^[a-zA-Z][a-zA-Z0-9+.-]*:[^\s]*$"),
];

/// Request-payload formats. These win over the standard ones.
const PAYLOAD_PATTERNS: &[(&str, &str)] = &[
    ("mongo-object-id", r"(?i)^[a-f0-9]{24}$"),
    ("alpha", r"(?i)^[A-Z]+$"),
    ("alphanumeric", r"(?i)^[0-9A-Z]+$"),
    ("numeric", r"^[-+]?[0-9]+$"),
    ("hexadecimal", r"(?i)^[0-9A-F]+$"),
    ("hexcolor", r"(?i)^#?([0-9A-F]{3}|[0-9A-F]{6})$"),
    ("decimal", r"^[-+]?([0-9]+|\.[0-9]+|[0-9]+\.[0-9]+)$"),
    (
        "float",
        r"^(?:[-+]?(?:[0-9]+))?(?:\.[0-9]*)?(?:[eE][-+]?(?:[0-9]+))?$",
    ),
    ("int", r"^(?:[-+]?(?:0|[1-9][0-9]*))$"),
    (
        "base64",
        r"(?i)^(?:[A-Z0-9+/]{4})*(?:[A-Z0-9+/]{2}==|[A-Z0-9+/]{3}=|[A-Z0-9+/]{4})$",
    ),
    (
        "uuid",
        r"(?i)^[0-9A-F]{8}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{12}$",
    ),
];

static BUILTIN_FORMATS: LazyLock<FormatRegistry> = LazyLock::new(FormatRegistry::build_builtin);

/// A single format matcher
#[derive(Clone)]
pub enum Format {
    /// Regular expression, tested unanchored (anchor it yourself)
    Pattern(Regex),
    /// Arbitrary predicate over the string value
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Format {
    /// Compile a format from a regular expression source
    pub fn pattern(name: &str, source: &str) -> Result<Self> {
        Regex::new(source)
            .map(Format::Pattern)
            .map_err(|source| SchemaError::InvalidFormat {
                name: name.to_string(),
                source,
            })
    }

    /// Wrap a predicate closure as a format
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Format::Predicate(Arc::new(f))
    }

    /// Check a string against this format
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Format::Pattern(re) => re.is_match(value),
            Format::Predicate(f) => f(value),
        }
    }
}

impl From<Regex> for Format {
    fn from(re: Regex) -> Self {
        Format::Pattern(re)
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Format::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Name -> matcher lookup table
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: HashMap<String, Format>,
}

impl FormatRegistry {
    /// The shared built-in registry
    pub fn builtin() -> &'static FormatRegistry {
        &BUILTIN_FORMATS
    }

    fn build_builtin() -> Self {
        let mut formats = HashMap::new();

        for (name, source) in STANDARD_PATTERNS.iter().chain(PAYLOAD_PATTERNS) {
            // Constant patterns; a failure here is a bug in the table above.
            let re = Regex::new(source).expect("built-in format pattern must compile");
            formats.insert((*name).to_string(), Format::Pattern(re));
        }

        formats.insert("ipv6".to_string(), Format::predicate(is_ipv6));
        formats.insert("hostname".to_string(), Format::predicate(is_hostname));

        Self { formats }
    }

    /// Build a new registry with `overrides` layered on top of this one.
    ///
    /// Caller entries win on name collision. `self` is left untouched.
    pub fn merged(&self, overrides: &HashMap<String, Format>) -> FormatRegistry {
        let mut formats = self.formats.clone();
        for (name, format) in overrides {
            formats.insert(name.clone(), format.clone());
        }
        tracing::trace!(
            overrides = overrides.len(),
            total = formats.len(),
            "merged format registry"
        );
        Self { formats }
    }

    /// Look up a format by exact name
    pub fn resolve(&self, name: &str) -> Option<&Format> {
        self.formats.get(name)
    }

    /// Whether a format is registered
    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

fn is_ipv6(value: &str) -> bool {
    value.parse::<Ipv6Addr>().is_ok()
}

fn is_hostname(value: &str) -> bool {
    if value.is_empty() || value.len() > 255 {
        return false;
    }
    value.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(name: &str, value: &str) -> bool {
        FormatRegistry::builtin()
            .resolve(name)
            .unwrap_or_else(|| panic!("missing built-in format {}", name))
            .matches(value)
    }

    #[test]
    fn test_mongo_object_id() {
        assert!(check("mongo-object-id", "507f1f77bcf86cd799439011"));
        assert!(check("mongo-object-id", "507F1F77BCF86CD799439011"));
        assert!(!check("mongo-object-id", "507f1f77bcf86cd79943901"));
        assert!(!check("mongo-object-id", "not-an-id"));
    }

    #[test]
    fn test_alpha_and_alphanumeric() {
        assert!(check("alpha", "abcXYZ"));
        assert!(!check("alpha", "abc1"));
        assert!(!check("alpha", ""));
        assert!(check("alphanumeric", "abc123"));
        assert!(!check("alphanumeric", "abc-123"));
    }

    #[test]
    fn test_numeric_and_int() {
        assert!(check("numeric", "-0042"));
        assert!(check("numeric", "+7"));
        assert!(!check("numeric", "1.5"));

        assert!(check("int", "0"));
        assert!(check("int", "-12"));
        assert!(!check("int", "012"));
        assert!(!check("int", "1e3"));
    }

    #[test]
    fn test_hex_formats() {
        assert!(check("hexadecimal", "deadBEEF"));
        assert!(!check("hexadecimal", "xyz"));
        assert!(check("hexcolor", "#fff"));
        assert!(check("hexcolor", "A0B1C2"));
        assert!(!check("hexcolor", "#ffff"));
    }

    #[test]
    fn test_decimal_and_float() {
        assert!(check("decimal", "12"));
        assert!(check("decimal", ".5"));
        assert!(check("decimal", "-3.25"));
        assert!(!check("decimal", "3."));

        assert!(check("float", "3."));
        assert!(check("float", "-1.5e10"));
        assert!(!check("float", "1.2.3"));
    }

    #[test]
    fn test_base64_and_uuid() {
        assert!(check("base64", "aGVsbG8="));
        assert!(check("base64", "aGVsbG8gd29ybGQh"));
        assert!(!check("base64", "aGVsbG8"));

        assert!(check("uuid", "123e4567-e89b-12d3-a456-426614174000"));
        assert!(!check("uuid", "123e4567e89b12d3a456426614174000"));
    }

    #[test]
    fn test_standard_formats() {
        assert!(check("date-time", "2024-03-01T12:30:00Z"));
        assert!(check("date", "2024-03-01"));
        assert!(!check("date", "2024-13-01"));
        assert!(check("email", "a@b.io"));
        assert!(!check("email", "nope"));
        assert!(check("ipv4", "192.168.0.1"));
        assert!(!check("ipv4", "256.1.1.1"));
        assert!(check("ipv6", "::1"));
        assert!(check("hostname", "api.example.com"));
        assert!(!check("hostname", "-bad.example.com"));
    }

    #[test]
    fn test_merge_overrides_without_touching_builtin() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "alpha".to_string(),
            Format::pattern("alpha", "^[a-z]+$").unwrap(),
        );
        overrides.insert(
            "even-length".to_string(),
            Format::predicate(|s| s.len() % 2 == 0),
        );

        let merged = FormatRegistry::builtin().merged(&overrides);

        assert!(!merged.resolve("alpha").unwrap().matches("ABC"));
        assert!(merged.resolve("even-length").unwrap().matches("ab"));
        assert_eq!(merged.len(), FormatRegistry::builtin().len() + 1);

        assert!(FormatRegistry::builtin().resolve("alpha").unwrap().matches("ABC"));
        assert!(!FormatRegistry::builtin().contains("even-length"));
    }

    #[test]
    fn test_invalid_custom_pattern() {
        let err = Format::pattern("broken", "[a-").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidFormat { ref name, .. } if name == "broken"));
    }
}
