//! Rules definition types for user-authored import filters.
//!
//! This module defines the document form of the filter rules: which catalogs, schemas,
//! tables, columns and procedures should be imported. Rules are user-edited; the
//! compiled form lives in `dbsift-filter`.
//!
//! # Example
//!
//! ```yaml
//! version: "1.0.0"
//! include_tables: ["CUSTOMER.*"]
//! catalogs:
//!   - name: SALES
//!     schemas:
//!       - name: PUBLIC
//!         exclude_tables: ["TEMP_.*"]
//!         include_tables:
//!           - pattern: ORDERS
//!             exclude_columns: ["INTERNAL_.*"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::ConfigError;

/// User-modifiable filter rules.
///
/// The top level is the root container: its rules apply to every catalog and schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesDefinition {
    /// Rules version (semver format).
    #[serde(default = "default_version")]
    pub version: String,

    /// Catalog-scoped rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catalogs: Vec<CatalogRules>,

    /// Schema-scoped rules that apply in every catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<SchemaRules>,

    /// Rules that apply regardless of catalog or schema.
    #[serde(flatten)]
    pub filters: FilterRules,
}

impl Default for RulesDefinition {
    fn default() -> Self {
        Self {
            version: default_version(),
            catalogs: Vec::new(),
            schemas: Vec::new(),
            filters: FilterRules::default(),
        }
    }
}

impl RulesDefinition {
    /// Load rules definition from a YAML (or JSON) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse rules definition from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Serialize the rules definition as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::from)
    }

    /// Get the first catalog with a given name.
    pub fn get_catalog(&self, name: &str) -> Option<&CatalogRules> {
        self.catalogs
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
    }

    /// Check if the definition declares no containers and no rules at all.
    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty() && self.schemas.is_empty() && self.filters.is_empty()
    }
}

/// Rules for a single catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogRules {
    /// Catalog name, matched literally. Absent means "any other catalog".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Schemas inside this catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<SchemaRules>,

    #[serde(flatten)]
    pub filters: FilterRules,
}

/// Rules for a single schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaRules {
    /// Schema name, matched literally. Absent means "any other schema".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub filters: FilterRules,
}

/// The six rule lists any container may hold.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterRules {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_tables: Vec<IncludeTableRule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_tables: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_columns: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_columns: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_procedures: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_procedures: Vec<String>,
}

impl FilterRules {
    pub fn is_empty(&self) -> bool {
        self.include_tables.is_empty()
            && self.exclude_tables.is_empty()
            && self.include_columns.is_empty()
            && self.exclude_columns.is_empty()
            && self.include_procedures.is_empty()
            && self.exclude_procedures.is_empty()
    }
}

/// An include-table rule.
///
/// Either a bare pattern or a pattern with its own column rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncludeTableRule {
    /// Bare table name pattern.
    Pattern(String),

    /// Pattern with table-specific column rules.
    Detailed(IncludeTableSpec),
}

impl IncludeTableRule {
    pub fn pattern(&self) -> &str {
        match self {
            IncludeTableRule::Pattern(p) => p,
            IncludeTableRule::Detailed(spec) => &spec.pattern,
        }
    }

    /// Column rules declared on this table, if any.
    pub fn column_rules(&self) -> (&[String], &[String]) {
        match self {
            IncludeTableRule::Pattern(_) => (&[], &[]),
            IncludeTableRule::Detailed(spec) => (&spec.include_columns, &spec.exclude_columns),
        }
    }
}

impl From<&str> for IncludeTableRule {
    fn from(pattern: &str) -> Self {
        IncludeTableRule::Pattern(pattern.to_string())
    }
}

/// Include-table rule with table-specific column overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IncludeTableSpec {
    pub pattern: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_columns: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_columns: Vec<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_rules_definition() {
        let yaml = r#"
version: "1.0.0"
include_tables: ["CUSTOMER.*"]
catalogs:
  - name: SALES
    schemas:
      - name: PUBLIC
        exclude_tables: ["TEMP_.*"]
        include_columns: [ID]
        include_tables:
          - ORDERS_ARCHIVE
          - pattern: ORDERS
            exclude_columns: ["INTERNAL_.*"]
  - include_procedures: ["sp_.*"]
schemas:
  - name: AUDIT
    exclude_tables: [".*_OLD"]
"#;

        let rules = RulesDefinition::from_yaml(yaml).unwrap();
        assert_eq!(rules.version, "1.0.0");
        assert_eq!(rules.filters.include_tables.len(), 1);
        assert_eq!(rules.filters.include_tables[0].pattern(), "CUSTOMER.*");

        let sales = rules.get_catalog("SALES").unwrap();
        let public = &sales.schemas[0];
        assert_eq!(public.name.as_deref(), Some("PUBLIC"));
        assert_eq!(public.filters.exclude_tables, vec!["TEMP_.*".to_string()]);
        assert_eq!(
            public.filters.include_tables[0],
            IncludeTableRule::Pattern("ORDERS_ARCHIVE".to_string())
        );

        let (includes, excludes) = public.filters.include_tables[1].column_rules();
        assert!(includes.is_empty());
        assert_eq!(excludes, ["INTERNAL_.*".to_string()]);

        // Unnamed catalog acts as a wildcard container.
        assert_eq!(rules.catalogs[1].name, None);
        assert_eq!(rules.catalogs[1].filters.include_procedures, vec!["sp_.*".to_string()]);

        assert_eq!(rules.schemas[0].name.as_deref(), Some("AUDIT"));
    }

    #[test]
    fn test_default_version_and_empty() {
        let rules = RulesDefinition::from_yaml("{}").unwrap();
        assert_eq!(rules.version, "1.0.0");
        assert!(rules.is_empty());
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut rules = RulesDefinition::default();
        let mut catalog = CatalogRules {
            name: Some("SALES".to_string()),
            ..CatalogRules::default()
        };
        catalog.filters.include_tables.push(IncludeTableRule::Detailed(IncludeTableSpec {
            pattern: "ORDERS".to_string(),
            include_columns: vec!["ID".to_string()],
            exclude_columns: Vec::new(),
        }));
        rules.catalogs.push(catalog);

        let yaml = rules.to_yaml().unwrap();
        let parsed = RulesDefinition::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, rules);
    }
}
