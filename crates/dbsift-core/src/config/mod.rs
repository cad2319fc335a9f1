//! Configuration types for dbsift.
//!
//! Configuration can be loaded from YAML files and combined into a single
//! `DbsiftConfig` structure.
//!
//! # Configuration Files
//!
//! - **dbsift.yaml**: Project file pointing at the rules and the schema snapshot
//! - **rules.yaml**: Include/exclude rules (see [`RulesDefinition`])
//! - **snapshot.yaml**: Discovered schema objects (see [`crate::live::SchemaSnapshot`])

pub mod rules_definition;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use rules_definition::{
    CatalogRules, FilterRules, IncludeTableRule, IncludeTableSpec, RulesDefinition, SchemaRules,
};

/// Complete dbsift project configuration loaded from files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbsiftConfig {
    /// Project name.
    #[serde(default)]
    pub project: Option<String>,

    /// Path to the rules file (alternative to inline rules).
    #[serde(default)]
    pub rules_file: Option<PathBuf>,

    /// Inline rules definition.
    #[serde(default)]
    pub rules: Option<RulesDefinition>,

    /// Path to the discovered schema snapshot.
    #[serde(default)]
    pub snapshot_file: Option<PathBuf>,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbsiftConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration and resolve all external references.
    ///
    /// Relative `rules_file` and `snapshot_file` paths are resolved against the directory
    /// of the configuration file, and the rules file is loaded into `rules`.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(snapshot_file) = &config.snapshot_file {
            config.snapshot_file = Some(resolve(&base_dir, snapshot_file));
        }

        if let Some(rules_file) = &config.rules_file {
            let rules_path = resolve(&base_dir, rules_file);

            if config.rules.is_some() {
                return Err(ConfigError::Config(format!(
                    "both inline rules and rules_file '{}' are set",
                    rules_path.display()
                )));
            }

            tracing::debug!(path = %rules_path.display(), "loading rules file");
            config.rules = Some(RulesDefinition::from_file(&rules_path)?);
            config.rules_file = Some(rules_path);
        }

        Ok(config)
    }

    /// Get the rules, or an empty definition when none are configured.
    pub fn rules_or_default(&self) -> RulesDefinition {
        self.rules.clone().unwrap_or_default()
    }
}

fn resolve(base_dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        base_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_with_context_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("rules.yaml"),
            "include_tables: [\"CUSTOMER.*\"]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("dbsift.yaml"),
            "project: demo\nrules_file: rules.yaml\nsnapshot_file: snapshot.yaml\n",
        )
        .unwrap();

        let config = DbsiftConfig::load_with_context(dir.path().join("dbsift.yaml")).unwrap();
        assert_eq!(config.project.as_deref(), Some("demo"));
        assert_eq!(config.snapshot_file, Some(dir.path().join("snapshot.yaml")));
        assert_eq!(config.rules_file, Some(dir.path().join("rules.yaml")));

        let rules = config.rules.unwrap();
        assert_eq!(rules.filters.include_tables[0].pattern(), "CUSTOMER.*");
    }

    #[test]
    fn test_inline_rules_conflict_with_rules_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rules.yaml"), "{}\n").unwrap();
        fs::write(
            dir.path().join("dbsift.yaml"),
            "rules_file: rules.yaml\nrules:\n  exclude_tables: [X]\n",
        )
        .unwrap();

        let err = DbsiftConfig::load_with_context(dir.path().join("dbsift.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DbsiftConfig::from_file("/nonexistent/dbsift.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
