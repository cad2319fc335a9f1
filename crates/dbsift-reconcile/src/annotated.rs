//! Result of a reconciliation pass.

use serde::Serialize;

use dbsift_core::{LiveNodeId, ObjectKind, RuleNodeId};
use dbsift_filter::{FilterError, Membership};

/// A live node with its resolved membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedNode {
    pub id: LiveNodeId,
    pub kind: ObjectKind,
    pub name: Option<String>,
    /// Dotted path, e.g. `SALES.PUBLIC.ORDERS`.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<LiveNodeId>,
    pub membership: Membership,
    /// Rule nodes describing the same object. Empty unless rules were supplied.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<RuleNodeId>,
}

/// Live tree annotated with memberships, plus the errors recovered on the way.
///
/// Nodes are stored in live-tree id order, so `nodes[id.index()]` is the annotation of
/// live node `id`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotatedTree {
    pub nodes: Vec<AnnotatedNode>,
    pub warnings: Vec<FilterError>,
}

impl AnnotatedTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: LiveNodeId) -> Option<&AnnotatedNode> {
        self.nodes.get(id.index()).filter(|node| node.id == id)
    }

    pub fn membership(&self, id: LiveNodeId) -> Option<Membership> {
        self.get(id).map(|node| node.membership)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotatedNode> {
        self.nodes.iter()
    }

    /// Nodes with the given membership.
    pub fn with_membership(&self, membership: Membership) -> impl Iterator<Item = &AnnotatedNode> {
        self.nodes.iter().filter(move |node| node.membership == membership)
    }

    pub fn count(&self, membership: Membership) -> usize {
        self.with_membership(membership).count()
    }

    /// Find a node by dotted path.
    pub fn find(&self, path: &str) -> Option<&AnnotatedNode> {
        self.nodes.iter().find(|node| node.path == path)
    }
}
