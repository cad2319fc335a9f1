//! Membership decisions for single objects.

use serde::Serialize;
use std::fmt;

use dbsift_core::ObjectKind;

use crate::error::FilterError;
use crate::filters::{FiltersConfig, SchemaFilter};

/// Outcome of a decision for one well-formed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Included,
    Excluded,
}

impl Decision {
    fn from_bool(included: bool) -> Self {
        if included {
            Decision::Included
        } else {
            Decision::Excluded
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Included => write!(f, "included"),
            Decision::Excluded => write!(f, "excluded"),
        }
    }
}

/// Membership of a live node after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    Included,
    Excluded,
    /// The node could not be evaluated (malformed identity).
    Undetermined,
}

impl From<Decision> for Membership {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Included => Membership::Included,
            Decision::Excluded => Membership::Excluded,
        }
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Membership::Included => write!(f, "included"),
            Membership::Excluded => write!(f, "excluded"),
            Membership::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Full identity of an object: its name plus the names of its ancestors.
///
/// Blank ancestor names are treated as absent. The name itself must be present and
/// non-blank, and columns must name their table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectPath<'a> {
    pub catalog: Option<&'a str>,
    pub schema: Option<&'a str>,
    /// Owning table (columns only).
    pub table: Option<&'a str>,
    pub name: Option<&'a str>,
}

impl<'a> ObjectPath<'a> {
    pub fn named(name: &'a str) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    pub fn in_catalog(mut self, catalog: &'a str) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn in_schema(mut self, schema: &'a str) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn of_table(mut self, table: &'a str) -> Self {
        self.table = Some(table);
        self
    }

    fn catalog_name(&self) -> Option<&'a str> {
        non_blank(self.catalog)
    }

    fn schema_name(&self) -> Option<&'a str> {
        non_blank(self.schema)
    }
}

impl fmt::Display for ObjectPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [self.catalog, self.schema, self.table]
            .into_iter()
            .flatten()
            .chain(std::iter::once(self.name.unwrap_or("?")))
            .collect();
        f.write_str(&parts.join("."))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Answers include/exclude questions against a compiled configuration.
#[derive(Debug, Clone, Copy)]
pub struct MembershipEvaluator<'a> {
    config: &'a FiltersConfig,
}

impl<'a> MembershipEvaluator<'a> {
    pub fn new(config: &'a FiltersConfig) -> Self {
        Self { config }
    }

    /// Decide whether the object at `path` is part of the import.
    ///
    /// Catalogs and schemas are included when a rule entry covers them. Tables and
    /// procedures are tested against their scope's filter. Columns use the owning table's
    /// column override when it has one, and the scope's column rules otherwise.
    pub fn decide(&self, path: &ObjectPath<'_>, kind: ObjectKind) -> Result<Decision, FilterError> {
        let name = non_blank(path.name).ok_or_else(|| {
            FilterError::malformed_live_node(path.to_string(), format!("{} has no name", kind))
        })?;

        let decision = match kind {
            ObjectKind::Catalog => Decision::from_bool(self.config.catalog(Some(name)).is_some()),
            ObjectKind::Schema => Decision::from_bool(
                self.config
                    .resolve(path.catalog_name(), Some(name))
                    .is_some(),
            ),
            ObjectKind::Table => self.with_scope(path, |scope| scope.tables().is_included(name)),
            ObjectKind::Procedure => {
                self.with_scope(path, |scope| scope.procedures().is_included(name))
            }
            ObjectKind::Column => {
                let table = non_blank(path.table).ok_or_else(|| {
                    FilterError::malformed_live_node(path.to_string(), "column has no owning table")
                })?;
                self.with_scope(path, |scope| scope.tables().is_column_included(table, name))
            }
        };

        tracing::trace!(path = %path, %kind, %decision, "decided membership");
        Ok(decision)
    }

    /// Objects outside every catalog/schema entry are excluded.
    fn with_scope(&self, path: &ObjectPath<'_>, test: impl FnOnce(&SchemaFilter) -> bool) -> Decision {
        match self.config.resolve(path.catalog_name(), path.schema_name()) {
            Some(scope) => Decision::from_bool(test(scope)),
            None => Decision::Excluded,
        }
    }
}

/// Decide membership of one object.
pub fn decide(
    config: &FiltersConfig,
    path: &ObjectPath<'_>,
    kind: ObjectKind,
) -> Result<Decision, FilterError> {
    MembershipEvaluator::new(config).decide(path, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use dbsift_core::{RuleTree, RulesDefinition};

    fn config(yaml: &str) -> FiltersConfig {
        let definition = RulesDefinition::from_yaml(yaml).unwrap();
        let compilation = compile(&RuleTree::from_definition(&definition));
        assert!(compilation.is_clean(), "{:?}", compilation.warnings);
        compilation.config
    }

    #[test]
    fn test_containers_follow_entries() {
        let config = config(
            r#"
catalogs:
  - name: SALES
    schemas:
      - name: PUBLIC
"#,
        );

        let sales = ObjectPath::named("SALES");
        assert_eq!(decide(&config, &sales, ObjectKind::Catalog), Ok(Decision::Included));
        let hr = ObjectPath::named("HR");
        assert_eq!(decide(&config, &hr, ObjectKind::Catalog), Ok(Decision::Excluded));

        let public = ObjectPath::named("PUBLIC").in_catalog("SALES");
        assert_eq!(decide(&config, &public, ObjectKind::Schema), Ok(Decision::Included));
        let other = ObjectPath::named("OTHER").in_catalog("SALES");
        assert_eq!(decide(&config, &other, ObjectKind::Schema), Ok(Decision::Excluded));

        // Tables in an uncovered schema are out as well.
        let table = ObjectPath::named("T").in_catalog("SALES").in_schema("OTHER");
        assert_eq!(decide(&config, &table, ObjectKind::Table), Ok(Decision::Excluded));
    }

    #[test]
    fn test_procedures_use_procedure_rules() {
        let config = config("exclude_procedures: [\"tmp_.*\"]\n");
        let evaluator = MembershipEvaluator::new(&config);

        let keep = ObjectPath::named("calc_total").in_schema("PUBLIC");
        let drop = ObjectPath::named("tmp_fix").in_schema("PUBLIC");
        assert_eq!(evaluator.decide(&keep, ObjectKind::Procedure), Ok(Decision::Included));
        assert_eq!(evaluator.decide(&drop, ObjectKind::Procedure), Ok(Decision::Excluded));

        // A table with the same name is unaffected.
        assert_eq!(evaluator.decide(&drop, ObjectKind::Table), Ok(Decision::Included));
    }

    #[test]
    fn test_column_decision_is_independent_of_table() {
        let config = config(
            r#"
exclude_tables: ["AUDIT"]
include_columns: ["ID"]
"#,
        );

        let column = ObjectPath::named("ID").of_table("AUDIT");
        assert_eq!(decide(&config, &column, ObjectKind::Column), Ok(Decision::Included));
        let table = ObjectPath::named("AUDIT");
        assert_eq!(decide(&config, &table, ObjectKind::Table), Ok(Decision::Excluded));
    }

    #[test]
    fn test_malformed_paths() {
        let config = FiltersConfig::default();

        let unnamed = ObjectPath::default().in_catalog("SALES");
        let err = decide(&config, &unnamed, ObjectKind::Table).unwrap_err();
        assert!(matches!(err, FilterError::MalformedLiveNode { .. }));

        let blank = ObjectPath::named("   ");
        assert!(decide(&config, &blank, ObjectKind::Procedure).is_err());

        let orphan = ObjectPath::named("ID").in_schema("PUBLIC");
        let err = decide(&config, &orphan, ObjectKind::Column).unwrap_err();
        assert_eq!(
            err,
            FilterError::malformed_live_node("PUBLIC.ID", "column has no owning table")
        );
    }

    #[test]
    fn test_blank_ancestors_are_absent() {
        let config = config(
            r#"
catalogs:
  - name: SALES
  - exclude_tables: ["X"]
"#,
        );

        let path = ObjectPath::named("X").in_catalog(" ");
        assert_eq!(decide(&config, &path, ObjectKind::Table), Ok(Decision::Excluded));
        let path = ObjectPath::named("X").in_catalog("SALES");
        assert_eq!(decide(&config, &path, ObjectKind::Table), Ok(Decision::Included));
    }

    #[test]
    fn test_path_display() {
        let path = ObjectPath::named("ID")
            .in_catalog("SALES")
            .in_schema("PUBLIC")
            .of_table("ORDERS");
        assert_eq!(path.to_string(), "SALES.PUBLIC.ORDERS.ID");
        assert_eq!(ObjectPath::default().to_string(), "?");
        assert_eq!(Membership::from(Decision::Excluded).to_string(), "excluded");
    }
}
