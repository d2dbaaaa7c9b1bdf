//! Configuration for validator defaults
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (payload-schema.toml)
//! - Environment variables (PAYLOAD_SCHEMA__*)
//!
//! ## Example config file (payload-schema.toml):
//! ```toml
//! [defaults]
//! filter = true
//! filter_readonly = true
//! debug = false
//!
//! [formats]
//! slug = "^[a-z0-9]+(?:-[a-z0-9]+)*$"
//! ticket = "^[A-Z]{2,5}-[0-9]+$"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::formats::Format;
use crate::ValidateOptions;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Default option flags
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Custom formats: name -> regular expression
    #[serde(default)]
    pub formats: BTreeMap<String, String>,
}

/// Default option flags applied to every call built from this config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Prune undeclared keys before validating
    #[serde(default)]
    pub filter: bool,

    /// Strip read-only properties after a successful validation
    #[serde(default)]
    pub filter_readonly: bool,

    /// Attach raw engine records to each error
    #[serde(default)]
    pub debug: bool,
}

impl ValidatorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "payload-schema.toml",
            ".payload-schema.toml",
            "config/payload-schema.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        let project_dirs = directories::ProjectDirs::from("dev", "familiar", "payload-schema");
        if let Some(config_dir) = project_dirs {
            let xdg_config = config_dir.config_dir().join("payload-schema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("PAYLOAD_SCHEMA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build call options from this config.
    ///
    /// Fails if any custom format pattern doesn't compile.
    pub fn options(&self) -> Result<ValidateOptions> {
        let mut options = ValidateOptions::new()
            .filter(self.defaults.filter)
            .filter_readonly(self.defaults.filter_readonly)
            .debug(self.defaults.debug);

        for (name, pattern) in &self.formats {
            options = options.format(name.clone(), Format::pattern(name, pattern)?);
        }

        tracing::debug!(formats = self.formats.len(), "built options from config");
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SchemaError;

    #[test]
    fn test_default_config() {
        let config = ValidatorConfig::default();
        assert!(!config.defaults.filter);
        assert!(!config.defaults.filter_readonly);
        assert!(config.formats.is_empty());
    }

    #[test]
    fn test_serialize_config() {
        let mut config = ValidatorConfig::default();
        config.formats.insert("slug".to_string(), "^[a-z-]+$".to_string());
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[defaults]"));
        assert!(toml_str.contains("[formats]"));
        assert!(toml_str.contains("slug"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.toml");
        std::fs::write(
            &path,
            "[defaults]\nfilter = true\n\n[formats]\nticket = \"^[A-Z]+-[0-9]+$\"\n",
        )
        .unwrap();

        let config = ValidatorConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert!(config.defaults.filter);
        assert!(!config.defaults.debug);

        let options = config.options().unwrap();
        assert!(options.filter);
        assert!(options.formats["ticket"].matches("OPS-12"));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = ValidatorConfig::default();
        config.defaults.debug = true;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = ValidatorConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert!(loaded.defaults.debug);
    }

    #[test]
    fn test_bad_format_pattern() {
        let mut config = ValidatorConfig::default();
        config.formats.insert("broken".to_string(), "[z-a]".to_string());
        assert!(matches!(config.options(), Err(SchemaError::InvalidFormat { .. })));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let result = ValidatorConfig::load_from(Some(path.to_str().unwrap()));
        assert!(matches!(result, Err(SchemaError::Config(_))));
    }
}
