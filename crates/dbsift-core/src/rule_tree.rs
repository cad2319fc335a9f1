//! Arena-backed rule tree.
//!
//! A [`RuleTree`] stores typed [`RuleNode`]s in a vector; each entry records its parent
//! index and its children. The root lives at index 0 and is never removed.
//!
//! Two ways of adding nodes exist:
//! - [`RuleTree::attach`] accepts any nesting. It is used for ingesting trees produced
//!   elsewhere; the compiler reports illegal nesting later.
//! - [`RuleTree::insert`] enforces the placement table ([`RuleNode::can_contain`]) and
//!   refuses duplicates. It backs interactive editing, together with
//!   [`RuleTree::relabel`] and [`RuleTree::remove`].
//!
//! Removed nodes leave an empty slot behind so that the ids of the remaining nodes stay
//! valid.

use serde::Serialize;
use std::fmt;

use crate::config::{
    CatalogRules, FilterRules, IncludeTableRule, IncludeTableSpec, RulesDefinition, SchemaRules,
};
use crate::kind::{ObjectKind, Polarity};

/// Index of a node inside a [`RuleTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RuleNodeId(usize);

impl RuleNodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RuleNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single node of the rule tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleNode {
    /// The implicit top-level container.
    Root,
    /// Catalog container. `None` (or a blank name) is a wildcard.
    Catalog { name: Option<String> },
    /// Schema container. `None` (or a blank name) is a wildcard.
    Schema { name: Option<String> },
    IncludeTable { pattern: String },
    ExcludeTable { pattern: String },
    IncludeColumn { pattern: String },
    ExcludeColumn { pattern: String },
    IncludeProcedure { pattern: String },
    ExcludeProcedure { pattern: String },
}

impl RuleNode {
    pub fn catalog(name: impl Into<String>) -> Self {
        RuleNode::Catalog {
            name: Some(name.into()),
        }
    }

    pub fn schema(name: impl Into<String>) -> Self {
        RuleNode::Schema {
            name: Some(name.into()),
        }
    }

    /// Build a pattern rule from its kind family and polarity.
    ///
    /// Returns `None` for catalogs and schemas, which are containers rather than rules.
    pub fn rule(family: ObjectKind, polarity: Polarity, pattern: impl Into<String>) -> Option<Self> {
        let pattern = pattern.into();
        let node = match (family, polarity) {
            (ObjectKind::Table, Polarity::Include) => RuleNode::IncludeTable { pattern },
            (ObjectKind::Table, Polarity::Exclude) => RuleNode::ExcludeTable { pattern },
            (ObjectKind::Column, Polarity::Include) => RuleNode::IncludeColumn { pattern },
            (ObjectKind::Column, Polarity::Exclude) => RuleNode::ExcludeColumn { pattern },
            (ObjectKind::Procedure, Polarity::Include) => RuleNode::IncludeProcedure { pattern },
            (ObjectKind::Procedure, Polarity::Exclude) => RuleNode::ExcludeProcedure { pattern },
            (ObjectKind::Catalog | ObjectKind::Schema, _) => return None,
        };
        Some(node)
    }

    /// The kind of object this node describes. `None` for the root.
    pub fn family(&self) -> Option<ObjectKind> {
        match self {
            RuleNode::Root => None,
            RuleNode::Catalog { .. } => Some(ObjectKind::Catalog),
            RuleNode::Schema { .. } => Some(ObjectKind::Schema),
            RuleNode::IncludeTable { .. } | RuleNode::ExcludeTable { .. } => Some(ObjectKind::Table),
            RuleNode::IncludeColumn { .. } | RuleNode::ExcludeColumn { .. } => {
                Some(ObjectKind::Column)
            }
            RuleNode::IncludeProcedure { .. } | RuleNode::ExcludeProcedure { .. } => {
                Some(ObjectKind::Procedure)
            }
        }
    }

    /// Polarity of a pattern rule. `None` for containers.
    pub fn polarity(&self) -> Option<Polarity> {
        match self {
            RuleNode::Root | RuleNode::Catalog { .. } | RuleNode::Schema { .. } => None,
            RuleNode::IncludeTable { .. }
            | RuleNode::IncludeColumn { .. }
            | RuleNode::IncludeProcedure { .. } => Some(Polarity::Include),
            RuleNode::ExcludeTable { .. }
            | RuleNode::ExcludeColumn { .. }
            | RuleNode::ExcludeProcedure { .. } => Some(Polarity::Exclude),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            RuleNode::Root | RuleNode::Catalog { .. } | RuleNode::Schema { .. }
        )
    }

    /// Pattern string of a rule node.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            RuleNode::Root | RuleNode::Catalog { .. } | RuleNode::Schema { .. } => None,
            RuleNode::IncludeTable { pattern }
            | RuleNode::ExcludeTable { pattern }
            | RuleNode::IncludeColumn { pattern }
            | RuleNode::ExcludeColumn { pattern }
            | RuleNode::IncludeProcedure { pattern }
            | RuleNode::ExcludeProcedure { pattern } => Some(pattern),
        }
    }

    /// Container name with blank names treated as absent.
    pub fn container_name(&self) -> Option<&str> {
        match self {
            RuleNode::Catalog { name } | RuleNode::Schema { name } => {
                name.as_deref().filter(|n| !n.trim().is_empty())
            }
            _ => None,
        }
    }

    /// The name or pattern shown for this node.
    pub fn label(&self) -> Option<&str> {
        if self.is_container() {
            self.container_name()
        } else {
            self.pattern()
        }
    }

    /// Placement table: which node kinds may appear directly below this one.
    pub fn can_contain(&self, child: &RuleNode) -> bool {
        match self {
            RuleNode::Root => !matches!(child, RuleNode::Root),
            RuleNode::Catalog { .. } => {
                !matches!(child, RuleNode::Root | RuleNode::Catalog { .. })
            }
            RuleNode::Schema { .. } => !child.is_container(),
            RuleNode::IncludeTable { .. } => matches!(
                child,
                RuleNode::IncludeColumn { .. } | RuleNode::ExcludeColumn { .. }
            ),
            RuleNode::ExcludeTable { .. }
            | RuleNode::IncludeColumn { .. }
            | RuleNode::ExcludeColumn { .. }
            | RuleNode::IncludeProcedure { .. }
            | RuleNode::ExcludeProcedure { .. } => false,
        }
    }

    /// The same kind of node carrying `label` as its name or pattern. `None` for the root.
    pub fn with_label(&self, label: impl Into<String>) -> Option<RuleNode> {
        let label = label.into();
        let node = match self {
            RuleNode::Root => return None,
            RuleNode::Catalog { .. } => RuleNode::Catalog { name: Some(label) },
            RuleNode::Schema { .. } => RuleNode::Schema { name: Some(label) },
            _ => RuleNode::rule(self.family()?, self.polarity()?, label)?,
        };
        Some(node)
    }

    /// Same variant and same label.
    fn same_as(&self, other: &RuleNode) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.label() == other.label()
    }
}

impl fmt::Display for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleNode::Root => write!(f, "root"),
            RuleNode::Catalog { .. } | RuleNode::Schema { .. } => {
                let kind = self.family().map(|k| k.to_string()).unwrap_or_default();
                match self.container_name() {
                    Some(name) => write!(f, "{} {}", kind, name),
                    None => write!(f, "{} <any>", kind),
                }
            }
            _ => {
                let polarity = self.polarity().map(|p| p.to_string()).unwrap_or_default();
                let kind = self.family().map(|k| k.to_string()).unwrap_or_default();
                write!(
                    f,
                    "{} {} '{}'",
                    polarity,
                    kind,
                    self.pattern().unwrap_or_default()
                )
            }
        }
    }
}

/// Errors raised while editing a rule tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The node id does not belong to this tree.
    #[error("unknown rule node {0}")]
    UnknownNode(RuleNodeId),

    /// The child kind may not be placed under the parent kind.
    #[error("{child} cannot be placed under {parent}")]
    InvalidPlacement { parent: String, child: String },

    /// An equivalent node already exists at the target.
    #[error("{child} already exists under {parent}")]
    Duplicate { parent: String, child: String },

    /// The root can be neither relabeled nor removed.
    #[error("the root node cannot be changed")]
    RootLocked,

    #[error("{0} cannot get a blank name or pattern")]
    BlankLabel(String),
}

/// Arena entry: a node plus its links.
#[derive(Debug, Clone)]
pub struct RuleTreeNode {
    node: RuleNode,
    parent: Option<RuleNodeId>,
    children: Vec<RuleNodeId>,
}

impl RuleTreeNode {
    pub fn node(&self) -> &RuleNode {
        &self.node
    }

    pub fn parent(&self) -> Option<RuleNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[RuleNodeId] {
        &self.children
    }
}

/// The user's rule tree.
#[derive(Debug, Clone)]
pub struct RuleTree {
    nodes: Vec<Option<RuleTreeNode>>,
}

impl Default for RuleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleTree {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(RuleTreeNode {
                node: RuleNode::Root,
                parent: None,
                children: Vec::new(),
            })],
        }
    }

    pub fn root(&self) -> RuleNodeId {
        RuleNodeId(0)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// True when the root has no containers and no rules.
    pub fn is_empty(&self) -> bool {
        self.children(self.root()).is_empty()
    }

    pub fn get(&self, id: RuleNodeId) -> Option<&RuleTreeNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: RuleNodeId) -> Option<&mut RuleTreeNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn node(&self, id: RuleNodeId) -> Option<&RuleNode> {
        self.get(id).map(|entry| &entry.node)
    }

    pub fn parent(&self, id: RuleNodeId) -> Option<RuleNodeId> {
        self.get(id).and_then(|entry| entry.parent)
    }

    pub fn children(&self, id: RuleNodeId) -> &[RuleNodeId] {
        self.get(id).map(|entry| entry.children.as_slice()).unwrap_or(&[])
    }

    /// All node ids in insertion order, root first.
    pub fn ids(&self) -> impl Iterator<Item = RuleNodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_some())
            .map(|(index, _)| RuleNodeId(index))
    }

    /// Ancestors of a node, nearest first. The node itself is not included.
    pub fn ancestors(&self, id: RuleNodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Human-readable path to a node, e.g. `root / catalog SALES / exclude table 'TEMP_.*'`.
    pub fn location(&self, id: RuleNodeId) -> String {
        let mut chain: Vec<RuleNodeId> = self.ancestors(id).collect();
        chain.reverse();
        chain.push(id);
        chain
            .into_iter()
            .filter_map(|n| self.node(n))
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    /// Add a node under `parent` without checking placement.
    pub fn attach(&mut self, parent: RuleNodeId, node: RuleNode) -> Result<RuleNodeId, TreeError> {
        if self.get(parent).is_none() {
            return Err(TreeError::UnknownNode(parent));
        }
        Ok(self.push(parent, node))
    }

    /// Add a node under `parent`, enforcing placement and refusing duplicates.
    ///
    /// A node is a duplicate when the parent itself, or one of its children, has the same
    /// variant and label.
    pub fn insert(&mut self, parent: RuleNodeId, node: RuleNode) -> Result<RuleNodeId, TreeError> {
        let target = self.node(parent).ok_or(TreeError::UnknownNode(parent))?;

        if !target.can_contain(&node) {
            return Err(TreeError::InvalidPlacement {
                parent: target.to_string(),
                child: node.to_string(),
            });
        }

        if target.same_as(&node) || self.find_child(parent, &node).is_some() {
            return Err(TreeError::Duplicate {
                parent: target.to_string(),
                child: node.to_string(),
            });
        }

        self.attach(parent, node)
    }

    /// Rename a container or change the pattern of a rule.
    ///
    /// The node keeps its kind, position and children. Blank labels and labels already
    /// carried by an equivalent sibling are refused.
    pub fn relabel(&mut self, id: RuleNodeId, label: &str) -> Result<(), TreeError> {
        let current = self.node(id).ok_or(TreeError::UnknownNode(id))?;
        if label.trim().is_empty() {
            return Err(TreeError::BlankLabel(current.to_string()));
        }
        let relabeled = current.with_label(label).ok_or(TreeError::RootLocked)?;

        if let Some(parent) = self.parent(id) {
            let clash = self
                .children(parent)
                .iter()
                .any(|&c| c != id && self.node(c).is_some_and(|n| n.same_as(&relabeled)));
            if clash {
                return Err(TreeError::Duplicate {
                    parent: self.node(parent).map(|n| n.to_string()).unwrap_or_default(),
                    child: relabeled.to_string(),
                });
            }
        }

        if let Some(entry) = self.get_mut(id) {
            entry.node = relabeled;
        }
        Ok(())
    }

    /// Remove a node together with its subtree and return the node.
    pub fn remove(&mut self, id: RuleNodeId) -> Result<RuleNode, TreeError> {
        if id == self.root() {
            return Err(TreeError::RootLocked);
        }
        let parent = self.get(id).ok_or(TreeError::UnknownNode(id))?.parent;
        if let Some(parent) = parent {
            if let Some(entry) = self.get_mut(parent) {
                entry.children.retain(|&c| c != id);
            }
        }

        let mut removed = None;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(entry) = self.nodes.get_mut(current.0).and_then(Option::take) else {
                continue;
            };
            stack.extend(entry.children);
            if current == id {
                removed = Some(entry.node);
            }
        }
        removed.ok_or(TreeError::UnknownNode(id))
    }

    /// Find a direct child with the same variant and label.
    pub fn find_child(&self, parent: RuleNodeId, node: &RuleNode) -> Option<RuleNodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.node(*c).is_some_and(|n| n.same_as(node)))
    }

    /// Find an existing child equal to `node`, or attach it.
    pub fn get_or_insert(
        &mut self,
        parent: RuleNodeId,
        node: RuleNode,
    ) -> Result<RuleNodeId, TreeError> {
        match self.find_child(parent, &node) {
            Some(existing) => Ok(existing),
            None => self.insert(parent, node),
        }
    }

    /// Build a rule tree from a rules document.
    pub fn from_definition(definition: &RulesDefinition) -> Self {
        let mut tree = Self::new();
        let root = tree.root();

        for catalog in &definition.catalogs {
            let catalog_id = tree.push(
                root,
                RuleNode::Catalog {
                    name: catalog.name.clone(),
                },
            );
            for schema in &catalog.schemas {
                let schema_id = tree.push(
                    catalog_id,
                    RuleNode::Schema {
                        name: schema.name.clone(),
                    },
                );
                tree.push_filters(schema_id, &schema.filters);
            }
            tree.push_filters(catalog_id, &catalog.filters);
        }

        for schema in &definition.schemas {
            let schema_id = tree.push(
                root,
                RuleNode::Schema {
                    name: schema.name.clone(),
                },
            );
            tree.push_filters(schema_id, &schema.filters);
        }

        tree.push_filters(root, &definition.filters);
        tree
    }

    /// Convert the tree back into a rules document.
    ///
    /// Nodes that the document cannot express (illegal nesting) are skipped.
    pub fn to_definition(&self) -> RulesDefinition {
        let mut definition = RulesDefinition::default();
        let root = self.root();

        for &child in self.children(root) {
            match self.node(child) {
                Some(RuleNode::Catalog { name }) => {
                    let mut catalog = CatalogRules {
                        name: name.clone(),
                        ..CatalogRules::default()
                    };
                    for &grandchild in self.children(child) {
                        if let Some(RuleNode::Schema { name }) = self.node(grandchild) {
                            catalog.schemas.push(self.schema_rules(grandchild, name));
                        }
                    }
                    self.collect_filters(child, &mut catalog.filters);
                    definition.catalogs.push(catalog);
                }
                Some(RuleNode::Schema { name }) => {
                    definition.schemas.push(self.schema_rules(child, name));
                }
                _ => {}
            }
        }

        self.collect_filters(root, &mut definition.filters);
        definition
    }

    fn push(&mut self, parent: RuleNodeId, node: RuleNode) -> RuleNodeId {
        let id = RuleNodeId(self.nodes.len());
        self.nodes.push(Some(RuleTreeNode {
            node,
            parent: Some(parent),
            children: Vec::new(),
        }));
        if let Some(entry) = self.get_mut(parent) {
            entry.children.push(id);
        }
        id
    }

    fn push_filters(&mut self, parent: RuleNodeId, filters: &FilterRules) {
        for table in &filters.include_tables {
            let table_id = self.push(
                parent,
                RuleNode::IncludeTable {
                    pattern: table.pattern().to_string(),
                },
            );
            let (includes, excludes) = table.column_rules();
            for pattern in includes {
                self.push(table_id, RuleNode::IncludeColumn { pattern: pattern.clone() });
            }
            for pattern in excludes {
                self.push(table_id, RuleNode::ExcludeColumn { pattern: pattern.clone() });
            }
        }
        for pattern in &filters.exclude_tables {
            self.push(parent, RuleNode::ExcludeTable { pattern: pattern.clone() });
        }
        for pattern in &filters.include_columns {
            self.push(parent, RuleNode::IncludeColumn { pattern: pattern.clone() });
        }
        for pattern in &filters.exclude_columns {
            self.push(parent, RuleNode::ExcludeColumn { pattern: pattern.clone() });
        }
        for pattern in &filters.include_procedures {
            self.push(parent, RuleNode::IncludeProcedure { pattern: pattern.clone() });
        }
        for pattern in &filters.exclude_procedures {
            self.push(parent, RuleNode::ExcludeProcedure { pattern: pattern.clone() });
        }
    }

    fn schema_rules(&self, id: RuleNodeId, name: &Option<String>) -> SchemaRules {
        let mut schema = SchemaRules {
            name: name.clone(),
            ..SchemaRules::default()
        };
        self.collect_filters(id, &mut schema.filters);
        schema
    }

    fn collect_filters(&self, container: RuleNodeId, filters: &mut FilterRules) {
        for &child in self.children(container) {
            let Some(node) = self.node(child) else {
                continue;
            };
            match node {
                RuleNode::IncludeTable { pattern } => {
                    let mut spec = IncludeTableSpec {
                        pattern: pattern.clone(),
                        ..IncludeTableSpec::default()
                    };
                    for &column in self.children(child) {
                        match self.node(column) {
                            Some(RuleNode::IncludeColumn { pattern }) => {
                                spec.include_columns.push(pattern.clone())
                            }
                            Some(RuleNode::ExcludeColumn { pattern }) => {
                                spec.exclude_columns.push(pattern.clone())
                            }
                            _ => {}
                        }
                    }
                    let rule = if spec.include_columns.is_empty() && spec.exclude_columns.is_empty()
                    {
                        IncludeTableRule::Pattern(spec.pattern)
                    } else {
                        IncludeTableRule::Detailed(spec)
                    };
                    filters.include_tables.push(rule);
                }
                RuleNode::ExcludeTable { pattern } => filters.exclude_tables.push(pattern.clone()),
                RuleNode::IncludeColumn { pattern } => filters.include_columns.push(pattern.clone()),
                RuleNode::ExcludeColumn { pattern } => filters.exclude_columns.push(pattern.clone()),
                RuleNode::IncludeProcedure { pattern } => {
                    filters.include_procedures.push(pattern.clone())
                }
                RuleNode::ExcludeProcedure { pattern } => {
                    filters.exclude_procedures.push(pattern.clone())
                }
                RuleNode::Root | RuleNode::Catalog { .. } | RuleNode::Schema { .. } => {}
            }
        }
    }
}

impl From<&RulesDefinition> for RuleTree {
    fn from(definition: &RulesDefinition) -> Self {
        Self::from_definition(definition)
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'a> {
    tree: &'a RuleTree,
    next: Option<RuleNodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = RuleNodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_definition() -> RulesDefinition {
        RulesDefinition::from_yaml(
            r#"
include_tables: [".*"]
catalogs:
  - name: SALES
    schemas:
      - name: PUBLIC
        exclude_tables: ["TEMP_.*"]
        include_tables:
          - pattern: ORDERS
            exclude_columns: ["INTERNAL_.*"]
schemas:
  - name: AUDIT
    include_procedures: ["log_.*"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_definition_shape() {
        let tree = RuleTree::from_definition(&sample_definition());
        let root = tree.root();

        let kinds: Vec<String> = tree
            .children(root)
            .iter()
            .map(|id| tree.node(*id).unwrap().to_string())
            .collect();
        assert_eq!(
            kinds,
            vec!["catalog SALES", "schema AUDIT", "include table '.*'"]
        );

        let sales = tree.children(root)[0];
        let public = tree.children(sales)[0];
        let orders = tree
            .find_child(public, &RuleNode::IncludeTable { pattern: "ORDERS".into() })
            .unwrap();
        let internal = tree.children(orders)[0];

        assert_eq!(
            tree.location(internal),
            "root / catalog SALES / schema PUBLIC / include table 'ORDERS' / exclude column 'INTERNAL_.*'"
        );
        assert_eq!(
            tree.ancestors(internal).collect::<Vec<_>>(),
            vec![orders, public, sales, root]
        );
    }

    #[test]
    fn test_definition_round_trip() {
        let definition = sample_definition();
        let tree = RuleTree::from(&definition);
        assert_eq!(tree.to_definition(), definition);
    }

    #[test]
    fn test_placement_table() {
        let root = RuleNode::Root;
        let catalog = RuleNode::catalog("SALES");
        let schema = RuleNode::schema("PUBLIC");
        let include_table = RuleNode::IncludeTable { pattern: "T".into() };
        let exclude_table = RuleNode::ExcludeTable { pattern: "T".into() };
        let include_column = RuleNode::IncludeColumn { pattern: "C".into() };
        let include_procedure = RuleNode::IncludeProcedure { pattern: "P".into() };

        assert!(root.can_contain(&catalog));
        assert!(root.can_contain(&schema));
        assert!(root.can_contain(&include_column));
        assert!(!catalog.can_contain(&catalog));
        assert!(catalog.can_contain(&schema));
        assert!(catalog.can_contain(&include_procedure));
        assert!(!schema.can_contain(&schema));
        assert!(schema.can_contain(&exclude_table));
        assert!(include_table.can_contain(&include_column));
        assert!(!include_table.can_contain(&include_procedure));
        assert!(!exclude_table.can_contain(&include_column));
    }

    #[test]
    fn test_insert_rejects_invalid_placement_and_duplicates() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let catalog = tree.insert(root, RuleNode::catalog("SALES")).unwrap();

        let err = tree.insert(catalog, RuleNode::catalog("HR")).unwrap_err();
        assert!(matches!(err, TreeError::InvalidPlacement { .. }));

        tree.insert(catalog, RuleNode::schema("PUBLIC")).unwrap();
        let err = tree.insert(catalog, RuleNode::schema("PUBLIC")).unwrap_err();
        assert!(matches!(err, TreeError::Duplicate { .. }));

        let exclude = tree
            .insert(catalog, RuleNode::ExcludeTable { pattern: "X".into() })
            .unwrap();
        let err = tree
            .insert(exclude, RuleNode::ExcludeTable { pattern: "X".into() })
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidPlacement { .. }));
    }

    #[test]
    fn test_attach_accepts_any_nesting() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let exclude = tree
            .attach(root, RuleNode::ExcludeTable { pattern: "X".into() })
            .unwrap();
        let nested = tree.attach(exclude, RuleNode::catalog("SALES")).unwrap();
        assert_eq!(tree.parent(nested), Some(exclude));

        let bogus = RuleNodeId(99);
        assert_eq!(
            tree.attach(bogus, RuleNode::Root).unwrap_err(),
            TreeError::UnknownNode(bogus)
        );
    }

    #[test]
    fn test_rule_constructor_and_family() {
        let node = RuleNode::rule(ObjectKind::Column, Polarity::Exclude, "X").unwrap();
        assert_eq!(node, RuleNode::ExcludeColumn { pattern: "X".into() });
        assert_eq!(node.family(), Some(ObjectKind::Column));
        assert_eq!(node.polarity(), Some(Polarity::Exclude));
        assert!(RuleNode::rule(ObjectKind::Schema, Polarity::Include, "X").is_none());
    }

    #[test]
    fn test_blank_container_name_is_wildcard() {
        let node = RuleNode::Catalog {
            name: Some("  ".to_string()),
        };
        assert_eq!(node.container_name(), None);
        assert_eq!(node.to_string(), "catalog <any>");
    }

    #[test]
    fn test_relabel_container_and_rule() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let sales = tree.insert(root, RuleNode::catalog("SALES")).unwrap();
        let exclude = tree
            .insert(sales, RuleNode::ExcludeTable { pattern: "TMP_.*".into() })
            .unwrap();

        tree.relabel(sales, "BILLING").unwrap();
        tree.relabel(exclude, "TEMP_.*").unwrap();

        assert_eq!(tree.node(sales), Some(&RuleNode::catalog("BILLING")));
        assert_eq!(tree.children(sales), &[exclude]);
        assert_eq!(
            tree.location(exclude),
            "root / catalog BILLING / exclude table 'TEMP_.*'"
        );

        // Keeping the current label is allowed.
        tree.relabel(sales, "BILLING").unwrap();
    }

    #[test]
    fn test_relabel_refusals() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let sales = tree.insert(root, RuleNode::catalog("SALES")).unwrap();
        tree.insert(root, RuleNode::catalog("HR")).unwrap();
        // A schema named like the catalog is not a duplicate.
        tree.insert(root, RuleNode::schema("PUBLIC")).unwrap();

        assert!(matches!(
            tree.relabel(sales, "HR").unwrap_err(),
            TreeError::Duplicate { .. }
        ));
        assert!(matches!(
            tree.relabel(sales, "  ").unwrap_err(),
            TreeError::BlankLabel(_)
        ));
        assert_eq!(tree.relabel(root, "X").unwrap_err(), TreeError::RootLocked);
        tree.relabel(sales, "PUBLIC").unwrap();

        let bogus = RuleNodeId(42);
        assert_eq!(
            tree.relabel(bogus, "X").unwrap_err(),
            TreeError::UnknownNode(bogus)
        );
    }

    #[test]
    fn test_remove_subtree() {
        let mut tree = RuleTree::from_definition(&sample_definition());
        let root = tree.root();
        let sales = tree.children(root)[0];
        let public = tree.children(sales)[0];
        let before = tree.len();

        let removed = tree.remove(sales).unwrap();
        assert_eq!(removed, RuleNode::catalog("SALES"));
        assert!(tree.node(sales).is_none());
        assert!(tree.node(public).is_none());
        assert_eq!(tree.len(), before - 5);
        assert!(!tree.ids().any(|id| id == public));

        let kinds: Vec<String> = tree
            .children(root)
            .iter()
            .map(|id| tree.node(*id).unwrap().to_string())
            .collect();
        assert_eq!(kinds, vec!["schema AUDIT", "include table '.*'"]);

        // Ids of the remaining nodes stay valid and new nodes still attach.
        let audit = tree.children(root)[0];
        tree.insert(audit, RuleNode::ExcludeTable { pattern: "X".into() })
            .unwrap();

        assert_eq!(tree.remove(sales).unwrap_err(), TreeError::UnknownNode(sales));
        assert_eq!(tree.remove(root).unwrap_err(), TreeError::RootLocked);
    }

    #[test]
    fn test_is_empty() {
        let mut tree = RuleTree::new();
        assert!(tree.is_empty());
        let root = tree.root();
        tree.insert(root, RuleNode::IncludeTable { pattern: ".*".into() })
            .unwrap();
        assert!(!tree.is_empty());
    }
}
