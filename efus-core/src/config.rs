//! Configuration parsing and management.

use crate::runtime::RuntimeValue;
use crate::yaml::{from_yaml_number, from_yaml_value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// File looked up next to the sources when no config path is given
pub const DEFAULT_CONFIG_FILE: &str = "efus.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Runtime configuration matching the efus.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfusConfig {
    /// Extra units for scalar literals, e.g. `em: 16`
    #[serde(default)]
    pub units: BTreeMap<String, serde_yaml::Number>,

    /// Names pre-bound in every root namespace
    #[serde(default)]
    pub constants: BTreeMap<String, serde_yaml::Value>,

    #[serde(default = "default_max_notify_depth")]
    pub max_notify_depth: usize,

    /// Attach the last alternative failure to union cast errors
    #[serde(default)]
    pub cast_diagnostics: bool,
}

fn default_max_notify_depth() -> usize {
    64
}

impl Default for EfusConfig {
    fn default() -> Self {
        Self {
            units: BTreeMap::new(),
            constants: BTreeMap::new(),
            max_notify_depth: default_max_notify_depth(),
            cast_diagnostics: false,
        }
    }
}

impl EfusConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Unit and constant entries to seed into a root namespace
    pub fn entries(&self) -> Vec<(String, RuntimeValue)> {
        let units = self
            .units
            .iter()
            .map(|(name, factor)| (name.clone(), from_yaml_number(factor)));
        let constants = self
            .constants
            .iter()
            .map(|(name, value)| (name.clone(), from_yaml_value(value.clone())));
        units.chain(constants).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let config = EfusConfig::default();
        assert_eq!(config.max_notify_depth, 64);
        assert!(!config.cast_diagnostics);
        assert!(config.entries().is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = EfusConfig::from_yaml_str("units:\n  em: 16\n  pt: 1.5\n").unwrap();
        assert_eq!(config.max_notify_depth, 64);
        let entries = config.entries();
        assert!(entries.contains(&("em".to_string(), RuntimeValue::from(16))));
        assert!(entries.contains(&("pt".to_string(), RuntimeValue::from(1.5))));
    }

    #[test]
    fn test_constants_and_flags() {
        let yaml = "constants:\n  title: Home\n  sizes: [1, 2]\nmax_notify_depth: 8\ncast_diagnostics: true\n";
        let config = EfusConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.max_notify_depth, 8);
        assert!(config.cast_diagnostics);
        let entries = config.entries();
        assert!(entries.contains(&("title".to_string(), RuntimeValue::from("Home"))));
        assert!(entries.contains(&(
            "sizes".to_string(),
            RuntimeValue::List(vec![RuntimeValue::from(1), RuntimeValue::from(2)])
        )));
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(DEFAULT_CONFIG_FILE);
        assert_eq!(EfusConfig::load_or_default(&missing).unwrap().max_notify_depth, 64);

        let mut file = std::fs::File::create(&missing).unwrap();
        writeln!(file, "max_notify_depth: 3").unwrap();
        assert_eq!(EfusConfig::load_or_default(&missing).unwrap().max_notify_depth, 3);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            EfusConfig::from_yaml_str("units: [unclosed"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
