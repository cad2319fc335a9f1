//! Rule tree compilation.
//!
//! The compiler turns a [`RuleTree`] into a [`FiltersConfig`] in two passes:
//!
//! 1. **Collect**: walk the tree, validate nesting and patterns, and gather the rules of
//!    each container into a level. Containers with the same literal name are merged
//!    (union of their patterns).
//! 2. **Build**: for every catalog/schema combination, merge the applicable levels
//!    (schema, catalog, root; innermost first) into one [`SchemaFilter`].
//!
//! | Level | Applies to |
//! |-------|------------|
//! | Root rules | every catalog and schema |
//! | Catalog `X` | catalog `X` only |
//! | Unnamed catalog | catalogs without a named entry |
//! | Schema `Y` (in a catalog or at root) | schema `Y` in the applicable catalogs |
//! | Unnamed schema | schemas without a named entry |
//!
//! Errors never abort compilation; they are collected as warnings.

use dbsift_core::{RuleNode, RuleNodeId, RuleTree};

use crate::error::FilterError;
use crate::filters::{CatalogFilter, FiltersConfig, SchemaFilter};
use crate::object::{ColumnFilter, IncludeTableFilter, ProcedureFilter, TableFilter};
use crate::pattern::Pattern;

/// Result of a compile pass: the configuration plus every recovered error.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub config: FiltersConfig,
    pub warnings: Vec<FilterError>,
}

impl Compilation {
    /// True when compilation recovered from nothing.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Compile a rule tree.
pub fn compile(tree: &RuleTree) -> Compilation {
    FiltersCompiler::new(tree).compile()
}

/// Rules declared directly in one container.
#[derive(Debug, Default)]
struct Level {
    includes: Vec<IncludeTableFilter>,
    table_excludes: Vec<Pattern>,
    columns: ColumnFilter,
    procedures: ProcedureFilter,
}

impl Level {
    fn absorb(&mut self, other: Level) {
        self.includes.extend(other.includes);
        for pattern in other.table_excludes {
            if !self.table_excludes.contains(&pattern) {
                self.table_excludes.push(pattern);
            }
        }
        self.columns.merge(&other.columns);
        self.procedures.merge(&other.procedures);
    }
}

#[derive(Debug)]
struct ScopedSchema {
    name: Option<String>,
    level: Level,
}

#[derive(Debug)]
struct ScopedCatalog {
    name: Option<String>,
    level: Level,
    schemas: Vec<ScopedSchema>,
}

#[derive(Debug, Default)]
struct Collected {
    root: Level,
    catalogs: Vec<ScopedCatalog>,
    schemas: Vec<ScopedSchema>,
}

/// Compiles a [`RuleTree`] into a [`FiltersConfig`].
pub struct FiltersCompiler<'a> {
    tree: &'a RuleTree,
    warnings: Vec<FilterError>,
}

impl<'a> FiltersCompiler<'a> {
    pub fn new(tree: &'a RuleTree) -> Self {
        Self {
            tree,
            warnings: Vec::new(),
        }
    }

    pub fn compile(mut self) -> Compilation {
        let collected = self.collect();
        let config = build(&collected);

        tracing::debug!(
            catalogs = config.catalogs().len(),
            warnings = self.warnings.len(),
            "compiled filter rules"
        );

        Compilation {
            config,
            warnings: self.warnings,
        }
    }

    // -------------------------------------------------------------------------
    // Collect pass
    // -------------------------------------------------------------------------

    fn collect(&mut self) -> Collected {
        let mut collected = Collected::default();
        let root = self.tree.root();

        for (child, node) in self.valid_children(root) {
            match node {
                RuleNode::Catalog { .. } => {
                    let catalog = self.collect_catalog(child, node);
                    merge_catalog(&mut collected.catalogs, catalog);
                }
                RuleNode::Schema { .. } => {
                    let schema = self.collect_schema(child, node);
                    merge_schema(&mut collected.schemas, schema);
                }
                _ => self.collect_rule(child, node, &mut collected.root),
            }
        }

        collected
    }

    fn collect_catalog(&mut self, id: RuleNodeId, node: &'a RuleNode) -> ScopedCatalog {
        let mut catalog = ScopedCatalog {
            name: node.container_name().map(str::to_string),
            level: Level::default(),
            schemas: Vec::new(),
        };

        for (child, child_node) in self.valid_children(id) {
            match child_node {
                RuleNode::Schema { .. } => {
                    let schema = self.collect_schema(child, child_node);
                    merge_schema(&mut catalog.schemas, schema);
                }
                _ => self.collect_rule(child, child_node, &mut catalog.level),
            }
        }

        catalog
    }

    fn collect_schema(&mut self, id: RuleNodeId, node: &'a RuleNode) -> ScopedSchema {
        let mut schema = ScopedSchema {
            name: node.container_name().map(str::to_string),
            level: Level::default(),
        };

        for (child, child_node) in self.valid_children(id) {
            self.collect_rule(child, child_node, &mut schema.level);
        }

        schema
    }

    fn collect_rule(&mut self, id: RuleNodeId, node: &'a RuleNode, level: &mut Level) {
        let pattern = self.compile_pattern(id, node);

        // Children are checked even when the rule itself is dropped.
        if let RuleNode::IncludeTable { .. } = node {
            let columns = self.collect_table_columns(id);
            if let Some(pattern) = pattern {
                level.includes.push(IncludeTableFilter::new(pattern, columns));
            }
            return;
        }

        // Leaf rules have no legal children; report any that were attached.
        self.valid_children(id);

        let Some(pattern) = pattern else {
            return;
        };
        match node {
            RuleNode::ExcludeTable { .. } => {
                if !level.table_excludes.contains(&pattern) {
                    level.table_excludes.push(pattern);
                }
            }
            RuleNode::IncludeColumn { .. } => level.columns.include(pattern),
            RuleNode::ExcludeColumn { .. } => level.columns.exclude(pattern),
            RuleNode::IncludeProcedure { .. } => level.procedures.include(pattern),
            RuleNode::ExcludeProcedure { .. } => level.procedures.exclude(pattern),
            RuleNode::IncludeTable { .. }
            | RuleNode::Root
            | RuleNode::Catalog { .. }
            | RuleNode::Schema { .. } => {}
        }
    }

    /// Column rules nested under an include table. `None` when no valid rule exists.
    fn collect_table_columns(&mut self, id: RuleNodeId) -> Option<ColumnFilter> {
        let mut level = Level::default();
        for (child, child_node) in self.valid_children(id) {
            self.collect_rule(child, child_node, &mut level);
        }

        let columns = level.columns;
        (!columns.is_empty()).then_some(columns)
    }

    /// Children that may legally appear under `id`. Others are reported and skipped
    /// together with their subtrees.
    fn valid_children(&mut self, id: RuleNodeId) -> Vec<(RuleNodeId, &'a RuleNode)> {
        let tree = self.tree;
        let Some(parent) = tree.node(id) else {
            return Vec::new();
        };

        let mut valid = Vec::new();
        for &child in tree.children(id) {
            let Some(node) = tree.node(child) else {
                continue;
            };
            if parent.can_contain(node) {
                valid.push((child, node));
            } else {
                self.warn(FilterError::malformed_rule_tree(
                    tree.location(child),
                    format!("{} cannot be placed under {}", node, parent),
                ));
            }
        }
        valid
    }

    fn compile_pattern(&mut self, id: RuleNodeId, node: &RuleNode) -> Option<Pattern> {
        let source = node.pattern()?;

        if source.trim().is_empty() {
            self.warn(FilterError::malformed_rule_tree(
                self.tree.location(id),
                "rule has an empty pattern",
            ));
            return None;
        }

        match Pattern::new(source) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                self.warn(FilterError::invalid_pattern(source, self.tree.location(id), &e));
                None
            }
        }
    }

    fn warn(&mut self, error: FilterError) {
        tracing::warn!(category = error.category(), "{}", error);
        self.warnings.push(error);
    }
}

fn merge_catalog(catalogs: &mut Vec<ScopedCatalog>, catalog: ScopedCatalog) {
    match catalogs.iter_mut().find(|c| c.name == catalog.name) {
        Some(existing) => {
            tracing::debug!(catalog = ?catalog.name, "merging duplicate catalog rules");
            existing.level.absorb(catalog.level);
            for schema in catalog.schemas {
                merge_schema(&mut existing.schemas, schema);
            }
        }
        None => catalogs.push(catalog),
    }
}

fn merge_schema(schemas: &mut Vec<ScopedSchema>, schema: ScopedSchema) {
    match schemas.iter_mut().find(|s| s.name == schema.name) {
        Some(existing) => {
            tracing::debug!(schema = ?schema.name, "merging duplicate schema rules");
            existing.level.absorb(schema.level);
        }
        None => schemas.push(schema),
    }
}

// -----------------------------------------------------------------------------
// Build pass
// -----------------------------------------------------------------------------

fn build(collected: &Collected) -> FiltersConfig {
    let catalog_names = entry_names(collected.catalogs.iter().map(|c| c.name.as_deref()));

    let catalogs = catalog_names
        .into_iter()
        .map(|catalog_name| {
            let catalog_levels: Vec<&ScopedCatalog> = collected
                .catalogs
                .iter()
                .filter(|c| c.name.as_deref() == catalog_name)
                .collect();

            let candidates: Vec<&ScopedSchema> = catalog_levels
                .iter()
                .flat_map(|c| c.schemas.iter())
                .chain(collected.schemas.iter())
                .collect();

            let schema_names = entry_names(candidates.iter().map(|s| s.name.as_deref()));

            let schemas = schema_names
                .into_iter()
                .map(|schema_name| {
                    let levels: Vec<&Level> = candidates
                        .iter()
                        .filter(|s| s.name.as_deref() == schema_name)
                        .map(|s| &s.level)
                        .chain(catalog_levels.iter().map(|c| &c.level))
                        .chain(std::iter::once(&collected.root))
                        .collect();
                    merge_levels(schema_name, &levels)
                })
                .collect();

            CatalogFilter::new(catalog_name.map(str::to_string), schemas)
        })
        .collect();

    FiltersConfig::new(catalogs)
}

/// Distinct named entries in declaration order, plus the wildcard entry when nothing is
/// named or an unnamed container was declared.
fn entry_names<'n>(names: impl Iterator<Item = Option<&'n str>>) -> Vec<Option<&'n str>> {
    let mut entries: Vec<Option<&str>> = Vec::new();
    let mut wildcard = false;

    for name in names {
        match name {
            Some(_) if !entries.contains(&name) => entries.push(name),
            Some(_) => {}
            None => wildcard = true,
        }
    }

    if entries.is_empty() || wildcard {
        entries.push(None);
    }
    entries
}

/// Merge levels, innermost first, into one schema filter.
fn merge_levels(name: Option<&str>, levels: &[&Level]) -> SchemaFilter {
    let mut tables = TableFilter::new();
    let mut procedures = ProcedureFilter::new();

    for level in levels {
        for include in &level.includes {
            tables.add_include(include.clone());
        }
        for pattern in &level.table_excludes {
            tables.add_exclude(pattern.clone());
        }
        tables.merge_columns(&level.columns);
        procedures.merge(&level.procedures);
    }

    SchemaFilter::new(name.map(str::to_string), tables, procedures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbsift_core::RulesDefinition;
    use pretty_assertions::assert_eq;

    fn compile_yaml(yaml: &str) -> Compilation {
        let definition = RulesDefinition::from_yaml(yaml).unwrap();
        compile(&RuleTree::from_definition(&definition))
    }

    fn entry_layout(config: &FiltersConfig) -> Vec<(Option<String>, Vec<Option<String>>)> {
        config
            .catalogs()
            .iter()
            .map(|c| {
                (
                    c.name().map(str::to_string),
                    c.schemas().iter().map(|s| s.name().map(str::to_string)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_tree_compiles_to_single_wildcard() {
        let compilation = compile(&RuleTree::new());
        assert!(compilation.is_clean());
        assert_eq!(entry_layout(&compilation.config), vec![(None, vec![None])]);

        let scope = compilation.config.resolve(Some("ANY"), Some("ANY")).unwrap();
        assert!(scope.tables().is_included("ANYTHING"));
        assert!(scope.procedures().is_included("ANYTHING"));
    }

    #[test]
    fn test_entry_layout_with_named_and_root_schemas() {
        let compilation = compile_yaml(
            r#"
catalogs:
  - name: SALES
    schemas:
      - name: PUBLIC
  - name: HR
schemas:
  - name: AUDIT
"#,
        );

        assert_eq!(
            entry_layout(&compilation.config),
            vec![
                (
                    Some("SALES".to_string()),
                    vec![Some("PUBLIC".to_string()), Some("AUDIT".to_string())]
                ),
                (Some("HR".to_string()), vec![Some("AUDIT".to_string())]),
            ]
        );
    }

    #[test]
    fn test_unnamed_containers_add_wildcards() {
        let compilation = compile_yaml(
            r#"
catalogs:
  - name: SALES
    schemas:
      - name: PUBLIC
      - exclude_tables: ["X"]
  - include_tables: ["Y"]
"#,
        );

        assert_eq!(
            entry_layout(&compilation.config),
            vec![
                (Some("SALES".to_string()), vec![Some("PUBLIC".to_string()), None]),
                (None, vec![None]),
            ]
        );

        let other = compilation.config.resolve(Some("SALES"), Some("OTHER")).unwrap();
        assert!(!other.tables().is_included("X"));

        let elsewhere = compilation.config.resolve(Some("HR"), None).unwrap();
        assert!(elsewhere.tables().is_included("Y"));
        assert!(!elsewhere.tables().is_included("Z"));
    }

    #[test]
    fn test_levels_merge_includes_and_excludes() {
        let compilation = compile_yaml(
            r#"
include_tables: ["A.*"]
catalogs:
  - name: SALES
    include_tables: ["B.*"]
    schemas:
      - name: PUBLIC
        include_tables: ["C.*"]
        exclude_tables: ["A_TMP"]
"#,
        );
        let scope = compilation.config.resolve(Some("SALES"), Some("PUBLIC")).unwrap();
        let tables = scope.tables();

        let includes: Vec<&str> = tables.includes().iter().map(|i| i.pattern().as_str()).collect();
        assert_eq!(includes, vec!["C.*", "B.*", "A.*"]);

        assert!(tables.is_included("A1"));
        assert!(tables.is_included("B1"));
        assert!(tables.is_included("C1"));
        assert!(!tables.is_included("A_TMP"));
        assert!(!tables.is_included("D1"));
    }

    #[test]
    fn test_duplicate_catalogs_are_merged() {
        let compilation = compile_yaml(
            r#"
catalogs:
  - name: SALES
    include_tables: ["A"]
    schemas:
      - name: PUBLIC
        exclude_tables: ["B"]
  - name: SALES
    include_tables: ["B"]
    schemas:
      - name: PUBLIC
        include_procedures: ["P"]
"#,
        );

        assert_eq!(compilation.config.catalogs().len(), 1);
        let scope = compilation.config.resolve(Some("SALES"), Some("PUBLIC")).unwrap();
        assert!(scope.tables().is_included("A"));
        assert!(!scope.tables().is_included("B"));
        assert!(scope.procedures().is_included("P"));
        assert!(!scope.procedures().is_included("Q"));
    }

    #[test]
    fn test_invalid_pattern_is_dropped_and_reported() {
        let compilation = compile_yaml(
            r#"
catalogs:
  - name: SALES
    include_tables: ["("]
    exclude_tables: ["TEMP_.*"]
"#,
        );

        assert_eq!(compilation.warnings.len(), 1);
        match &compilation.warnings[0] {
            FilterError::InvalidPattern { pattern, location, .. } => {
                assert_eq!(pattern, "(");
                assert_eq!(location, "root / catalog SALES / include table '('");
            }
            other => panic!("unexpected warning: {other}"),
        }

        // The broken include contributes nothing: default-allow minus the exclude.
        let scope = compilation.config.resolve(Some("SALES"), None).unwrap();
        assert!(scope.tables().is_included("ORDERS"));
        assert!(!scope.tables().is_included("TEMP_LOG"));
    }

    #[test]
    fn test_malformed_nesting_is_skipped() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let catalog = tree.attach(root, RuleNode::catalog("SALES")).unwrap();
        let nested = tree.attach(catalog, RuleNode::catalog("INNER")).unwrap();
        tree.attach(nested, RuleNode::ExcludeTable { pattern: ".*".into() })
            .unwrap();
        let exclude = tree
            .attach(catalog, RuleNode::ExcludeTable { pattern: "X".into() })
            .unwrap();
        tree.attach(exclude, RuleNode::IncludeColumn { pattern: "C".into() })
            .unwrap();

        let compilation = compile(&tree);
        assert_eq!(compilation.warnings.len(), 2);
        assert!(compilation
            .warnings
            .iter()
            .all(|w| matches!(w, FilterError::MalformedRuleTree { .. })));

        // The nested catalog's exclude-all never applied.
        let scope = compilation.config.resolve(Some("SALES"), None).unwrap();
        assert!(scope.tables().is_included("ORDERS"));
        assert!(!scope.tables().is_included("X"));
        assert!(scope.tables().is_column_included("ORDERS", "ANY"));
    }

    #[test]
    fn test_blank_pattern_is_malformed() {
        let compilation = compile_yaml("exclude_tables: [\"  \"]\n");
        assert_eq!(compilation.warnings.len(), 1);
        assert!(matches!(
            compilation.warnings[0],
            FilterError::MalformedRuleTree { .. }
        ));
    }

    #[test]
    fn test_table_override_with_only_invalid_columns_is_absent() {
        let compilation = compile_yaml(
            r#"
include_columns: ["ID"]
include_tables:
  - pattern: ORDERS
    include_columns: ["["]
"#,
        );
        assert_eq!(compilation.warnings.len(), 1);

        let scope = compilation.config.resolve(None, None).unwrap();
        assert!(scope.tables().includes()[0].columns().is_none());
        assert!(!scope.tables().is_column_included("ORDERS", "NAME"));
        assert!(scope.tables().is_column_included("ORDERS", "ID"));
    }

    fn locations(compilation: &Compilation) -> Vec<(&'static str, String)> {
        compilation
            .warnings
            .iter()
            .map(|w| match w {
                FilterError::InvalidPattern { location, .. }
                | FilterError::MalformedRuleTree { location, .. } => {
                    (w.category(), location.clone())
                }
                FilterError::MalformedLiveNode { node, .. } => (w.category(), node.clone()),
            })
            .collect()
    }

    #[test]
    fn test_nesting_under_table_column_rule_is_reported() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let orders = tree
            .attach(root, RuleNode::IncludeTable { pattern: "ORDERS".into() })
            .unwrap();
        let id = tree
            .attach(orders, RuleNode::IncludeColumn { pattern: "ID".into() })
            .unwrap();
        tree.attach(id, RuleNode::ExcludeTable { pattern: ".*".into() })
            .unwrap();

        let compilation = compile(&tree);
        assert_eq!(
            locations(&compilation),
            vec![(
                "malformed_rule_tree",
                "root / include table 'ORDERS' / include column 'ID' / exclude table '.*'"
                    .to_string()
            )]
        );

        // The column rule itself still applies; the stray exclude does not.
        let scope = compilation.config.resolve(None, None).unwrap();
        assert!(scope.tables().is_included("ORDERS"));
        assert!(scope.tables().is_column_included("ORDERS", "ID"));
        assert!(!scope.tables().is_column_included("ORDERS", "NAME"));
    }

    #[test]
    fn test_children_of_invalid_rule_are_still_checked() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let broken = tree
            .attach(root, RuleNode::IncludeTable { pattern: "(".into() })
            .unwrap();
        tree.attach(broken, RuleNode::IncludeColumn { pattern: "[".into() })
            .unwrap();
        tree.attach(broken, RuleNode::catalog("SALES")).unwrap();
        let exclude = tree
            .attach(root, RuleNode::ExcludeProcedure { pattern: ")".into() })
            .unwrap();
        tree.attach(exclude, RuleNode::IncludeColumn { pattern: "C".into() })
            .unwrap();

        let compilation = compile(&tree);
        assert_eq!(
            locations(&compilation),
            vec![
                ("invalid_pattern", "root / include table '('".to_string()),
                (
                    "malformed_rule_tree",
                    "root / include table '(' / catalog SALES".to_string()
                ),
                (
                    "invalid_pattern",
                    "root / include table '(' / include column '['".to_string()
                ),
                ("invalid_pattern", "root / exclude procedure ')'".to_string()),
                (
                    "malformed_rule_tree",
                    "root / exclude procedure ')' / include column 'C'".to_string()
                ),
            ]
        );

        // Everything under the broken rules is discarded.
        let scope = compilation.config.resolve(None, None).unwrap();
        assert!(scope.tables().includes().is_empty());
        assert!(scope.tables().is_column_included("ORDERS", "ANY"));
        assert!(scope.procedures().is_included("ANY"));
    }
}
