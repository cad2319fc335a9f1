//! Building rule trees from discovered objects.

use thiserror::Error;

use dbsift_core::{
    LiveNodeId, LiveTree, ObjectKind, Polarity, RuleNode, RuleNodeId, RuleTree, TreeError,
};

/// Errors raised while adopting a live object into a rule tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaffoldError {
    #[error("unknown live node {0}")]
    UnknownLiveNode(LiveNodeId),

    #[error("live node {0} has no name")]
    Unnamed(String),

    /// Catalogs and schemas can only be included.
    #[error("a {0} cannot be excluded")]
    ExcludeNotAllowed(ObjectKind),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Build a rule tree that includes every discovered table and procedure.
///
/// Catalogs and schemas become containers. Tables and procedures become include rules
/// whose patterns match the discovered name literally. Columns are not listed: an
/// included table brings all of its columns. Unnamed nodes are skipped.
///
/// Objects that sit next to named catalogs (or named schemas) without belonging to one
/// are placed in an unnamed catalog (or schema). Named containers hide the wildcard
/// entry, so those objects would otherwise match no rule at all.
pub fn scaffold_rules(live: &LiveTree) -> RuleTree {
    let mut rules = RuleTree::new();
    let mut pending: Vec<(RuleNodeId, Vec<LiveNodeId>)> =
        vec![(rules.root(), live.roots().to_vec())];

    while let Some((target, mut members)) = pending.pop() {
        let mut spilled = Vec::new();
        match rules.node(target) {
            Some(RuleNode::Root) => {
                let outside = take_shadowed(live, &mut members, ObjectKind::Catalog);
                if outside.is_empty() {
                    let loose = take_shadowed(live, &mut members, ObjectKind::Schema);
                    spilled.push((RuleNode::Schema { name: None }, loose));
                } else {
                    spilled.push((RuleNode::Catalog { name: None }, outside));
                }
            }
            Some(RuleNode::Catalog { .. }) => {
                let loose = take_shadowed(live, &mut members, ObjectKind::Schema);
                spilled.push((RuleNode::Schema { name: None }, loose));
            }
            _ => {}
        }

        for id in members {
            scaffold_node(&mut rules, target, live, id, &mut pending);
        }

        for (container, moved) in spilled {
            if moved.is_empty() {
                continue;
            }
            match rules.get_or_insert(target, container) {
                Ok(wildcard) => pending.push((wildcard, moved)),
                Err(e) => tracing::debug!("not scaffolded: {}", e),
            }
        }
    }

    tracing::debug!(rules = rules.len() - 1, "scaffolded rules from live schema");
    rules
}

/// Split off the members that a named `container` sibling would shadow, i.e. every
/// object of a deeper kind. Nothing is taken unless a named container of that kind and a
/// named table, procedure (or, for catalogs, schema) share the level.
fn take_shadowed(
    live: &LiveTree,
    members: &mut Vec<LiveNodeId>,
    container: ObjectKind,
) -> Vec<LiveNodeId> {
    let shadowing = members
        .iter()
        .any(|&id| is_named(live, id, |kind| kind == container));
    let scaffoldable = members.iter().any(|&id| {
        is_named(live, id, |kind| kind > container && kind != ObjectKind::Column)
    });
    if !shadowing || !scaffoldable {
        return Vec::new();
    }

    let (shadowed, kept): (Vec<LiveNodeId>, Vec<LiveNodeId>) = std::mem::take(members)
        .into_iter()
        .partition(|&id| live.get(id).is_some_and(|n| n.kind() > container));
    *members = kept;
    shadowed
}

fn is_named(live: &LiveTree, id: LiveNodeId, accept: impl Fn(ObjectKind) -> bool) -> bool {
    live.get(id).is_some_and(|n| {
        accept(n.kind()) && n.name().is_some_and(|name| !name.trim().is_empty())
    })
}

fn scaffold_node(
    rules: &mut RuleTree,
    target: RuleNodeId,
    live: &LiveTree,
    id: LiveNodeId,
    pending: &mut Vec<(RuleNodeId, Vec<LiveNodeId>)>,
) {
    let Some(node) = live.get(id) else {
        return;
    };
    let Some(name) = node.name().filter(|n| !n.trim().is_empty()) else {
        tracing::debug!(node = %id, "skipping unnamed live node");
        return;
    };

    let rule = match node.kind() {
        ObjectKind::Catalog => RuleNode::catalog(name),
        ObjectKind::Schema => RuleNode::schema(name),
        ObjectKind::Table => RuleNode::IncludeTable {
            pattern: literal(name),
        },
        ObjectKind::Procedure => RuleNode::IncludeProcedure {
            pattern: literal(name),
        },
        ObjectKind::Column => return,
    };

    let container = rule.is_container();
    match rules.get_or_insert(target, rule) {
        Ok(inserted) if container => pending.push((inserted, live.children(id).to_vec())),
        Ok(_) => {}
        Err(e) => tracing::debug!(node = %live.display_path(id), "not scaffolded: {}", e),
    }
}

/// Turn a live object into a rule and add it to `rules`.
///
/// The rule is placed under `target` when the target can hold it, otherwise under the
/// target's parent. Returns `Ok(None)` when an equivalent rule already exists there.
pub fn adopt(
    rules: &mut RuleTree,
    target: RuleNodeId,
    live: &LiveTree,
    node: LiveNodeId,
    polarity: Polarity,
) -> Result<Option<RuleNodeId>, ScaffoldError> {
    let live_node = live.get(node).ok_or(ScaffoldError::UnknownLiveNode(node))?;
    let name = live_node
        .name()
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ScaffoldError::Unnamed(live.display_path(node)))?;

    let kind = live_node.kind();
    let rule = match (kind, polarity) {
        (ObjectKind::Catalog, Polarity::Include) => RuleNode::catalog(name),
        (ObjectKind::Schema, Polarity::Include) => RuleNode::schema(name),
        (ObjectKind::Catalog | ObjectKind::Schema, Polarity::Exclude) => {
            return Err(ScaffoldError::ExcludeNotAllowed(kind));
        }
        (family, polarity) => RuleNode::rule(family, polarity, literal(name))
            .ok_or(ScaffoldError::ExcludeNotAllowed(kind))?,
    };

    let target_node = rules.node(target).ok_or(TreeError::UnknownNode(target))?;
    let parent = if target_node.can_contain(&rule) {
        target
    } else {
        rules.parent(target).unwrap_or(target)
    };

    match rules.insert(parent, rule) {
        Ok(id) => {
            tracing::debug!(rule = %rules.location(id), "adopted live object");
            Ok(Some(id))
        }
        Err(TreeError::Duplicate { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A pattern that matches `name` and nothing else.
fn literal(name: &str) -> String {
    regex::escape(name)
}
