//! Live (discovered) schema types.
//!
//! The metadata collaborator produces a flat list of [`DiscoveredObject`]s, each tagged
//! with its kind, name and ancestor names. [`LiveTree::from_objects`] folds that list into
//! an arena tree, creating the implied catalog, schema and table nodes on the way.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::ConfigError;
use crate::kind::ObjectKind;

/// A discovered database object with its ancestor names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredObject {
    pub kind: ObjectKind,

    /// Object name. A missing name is kept so it can be reported, not dropped.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Owning table (columns only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl DiscoveredObject {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            catalog: None,
            schema: None,
            table: None,
        }
    }

    pub fn in_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn of_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

/// A captured list of discovered objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    #[serde(default)]
    pub objects: Vec<DiscoveredObject>,
}

impl SchemaSnapshot {
    /// Load a snapshot from a YAML (or JSON) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse a snapshot from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }
}

/// Index of a node inside a [`LiveTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LiveNodeId(usize);

impl LiveNodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LiveNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the live schema tree.
#[derive(Debug, Clone)]
pub struct LiveNode {
    kind: ObjectKind,
    name: Option<String>,
    parent: Option<LiveNodeId>,
    children: Vec<LiveNodeId>,
}

impl LiveNode {
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<LiveNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[LiveNodeId] {
        &self.children
    }
}

/// Discovered schema as an arena tree. Top-level nodes are usually catalogs, but
/// databases without catalogs put schemas (or tables) at the top.
#[derive(Debug, Clone, Default)]
pub struct LiveTree {
    nodes: Vec<LiveNode>,
    roots: Vec<LiveNodeId>,
}

impl LiveTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: LiveNodeId) -> Option<&LiveNode> {
        self.nodes.get(id.0)
    }

    pub fn roots(&self) -> &[LiveNodeId] {
        &self.roots
    }

    pub fn children(&self, id: LiveNodeId) -> &[LiveNodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: LiveNodeId) -> Option<LiveNodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn ids(&self) -> impl Iterator<Item = LiveNodeId> + '_ {
        (0..self.nodes.len()).map(LiveNodeId)
    }

    /// Ancestors of a node, nearest first.
    pub fn ancestors(&self, id: LiveNodeId) -> impl Iterator<Item = LiveNodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Add a node. Returns `None` if `parent` does not belong to this tree.
    pub fn add(
        &mut self,
        parent: Option<LiveNodeId>,
        kind: ObjectKind,
        name: Option<String>,
    ) -> Option<LiveNodeId> {
        if let Some(parent) = parent {
            self.get(parent)?;
        }
        Some(self.push(parent, kind, name))
    }

    /// Find a named child of `parent` (or a named top-level node).
    pub fn find(&self, parent: Option<LiveNodeId>, kind: ObjectKind, name: &str) -> Option<LiveNodeId> {
        let siblings = match parent {
            Some(parent) => self.children(parent),
            None => self.roots.as_slice(),
        };
        siblings.iter().copied().find(|id| {
            self.get(*id)
                .is_some_and(|n| n.kind == kind && n.name.as_deref() == Some(name))
        })
    }

    /// Fold discovered objects into a tree, creating implied ancestors.
    ///
    /// Named objects are de-duplicated per parent; unnamed objects always get their own
    /// node so that they can be reported individually.
    pub fn from_objects<'a>(objects: impl IntoIterator<Item = &'a DiscoveredObject>) -> Self {
        let mut tree = Self::new();

        for object in objects {
            let mut parent = None;

            if object.kind != ObjectKind::Catalog {
                if let Some(catalog) = &object.catalog {
                    parent = Some(tree.get_or_add(None, ObjectKind::Catalog, catalog));
                }
            }

            if !object.kind.is_container() {
                if let Some(schema) = &object.schema {
                    parent = Some(tree.get_or_add(parent, ObjectKind::Schema, schema));
                }
            }

            if object.kind == ObjectKind::Column {
                if let Some(table) = &object.table {
                    parent = Some(tree.get_or_add(parent, ObjectKind::Table, table));
                }
            }

            match &object.name {
                Some(name) => {
                    tree.get_or_add(parent, object.kind, name);
                }
                None => {
                    tree.add(parent, object.kind, None);
                }
            }
        }

        tracing::debug!(nodes = tree.len(), "built live schema tree");
        tree
    }

    /// Dotted path of a node, e.g. `SALES.PUBLIC.ORDERS`.
    pub fn display_path(&self, id: LiveNodeId) -> String {
        let mut chain: Vec<LiveNodeId> = self.ancestors(id).collect();
        chain.reverse();
        chain.push(id);
        chain
            .into_iter()
            .filter_map(|n| self.get(n))
            .map(|n| n.name().unwrap_or("?"))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn get_or_add(&mut self, parent: Option<LiveNodeId>, kind: ObjectKind, name: &str) -> LiveNodeId {
        match self.find(parent, kind, name) {
            Some(existing) => existing,
            None => self.push(parent, kind, Some(name.to_string())),
        }
    }

    fn push(&mut self, parent: Option<LiveNodeId>, kind: ObjectKind, name: Option<String>) -> LiveNodeId {
        let id = LiveNodeId(self.nodes.len());
        self.nodes.push(LiveNode {
            kind,
            name,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => {
                if let Some(entry) = self.nodes.get_mut(parent.0) {
                    entry.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        id
    }
}

impl From<&SchemaSnapshot> for LiveTree {
    fn from(snapshot: &SchemaSnapshot) -> Self {
        Self::from_objects(&snapshot.objects)
    }
}
