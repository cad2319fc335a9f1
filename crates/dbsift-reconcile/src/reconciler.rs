//! Walks a live schema tree and annotates every node with its membership.

use dbsift_core::{LiveNodeId, LiveTree, ObjectKind, RuleNodeId, RuleTree};
use dbsift_filter::{FilterError, FiltersConfig, Membership, MembershipEvaluator, ObjectPath};

use crate::annotated::{AnnotatedNode, AnnotatedTree};
use crate::matcher::{ShapeLink, ShapeMatcher};

/// Reconciles compiled rules against a live schema.
///
/// ```ignore
/// let annotated = Reconciler::new(&compilation.config)
///     .with_rules(&tree)
///     .reconcile(&live);
/// ```
pub struct Reconciler<'a> {
    evaluator: MembershipEvaluator<'a>,
    matcher: Option<ShapeMatcher>,
}

/// A node waiting to be visited, with the named ancestors above it.
struct Visit<'t> {
    id: LiveNodeId,
    ancestors: Vec<ShapeLink<'t>>,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a FiltersConfig) -> Self {
        Self {
            evaluator: MembershipEvaluator::new(config),
            matcher: None,
        }
    }

    /// Also report which rule nodes describe each live node.
    pub fn with_rules(mut self, rules: &RuleTree) -> Self {
        self.matcher = Some(ShapeMatcher::new(rules));
        self
    }

    /// Annotate every node of `live`.
    ///
    /// The walk is depth-first and each node is annotated before its children. An excluded
    /// node does not stop its descendants from being evaluated. Malformed nodes become
    /// [`Membership::Undetermined`] and are reported in the warnings.
    pub fn reconcile(&self, live: &LiveTree) -> AnnotatedTree {
        let mut slots: Vec<Option<AnnotatedNode>> = vec![None; live.len()];
        let mut warnings = Vec::new();

        let mut stack: Vec<Visit<'_>> = live
            .roots()
            .iter()
            .rev()
            .map(|&id| Visit {
                id,
                ancestors: Vec::new(),
            })
            .collect();

        while let Some(visit) = stack.pop() {
            let Some(node) = live.get(visit.id) else {
                continue;
            };

            let (membership, matches) = match self.evaluate(live, &visit) {
                Ok(result) => result,
                Err(error) => {
                    tracing::warn!(node = %visit.id, "{}", error);
                    warnings.push(error);
                    (Membership::Undetermined, Vec::new())
                }
            };

            if let Some(slot) = slots.get_mut(visit.id.index()) {
                *slot = Some(AnnotatedNode {
                    id: visit.id,
                    kind: node.kind(),
                    name: node.name().map(str::to_string),
                    path: live.display_path(visit.id),
                    parent: node.parent(),
                    membership,
                    matches,
                });
            }

            let mut child_ancestors = visit.ancestors;
            if let Some(name) = node.name().filter(|n| !n.trim().is_empty()) {
                child_ancestors.push(ShapeLink::new(node.kind(), name));
            }
            for &child in live.children(visit.id).iter().rev() {
                stack.push(Visit {
                    id: child,
                    ancestors: child_ancestors.clone(),
                });
            }
        }

        let nodes: Vec<AnnotatedNode> = slots.into_iter().flatten().collect();
        let annotated = AnnotatedTree { nodes, warnings };

        tracing::debug!(
            nodes = annotated.len(),
            included = annotated.count(Membership::Included),
            excluded = annotated.count(Membership::Excluded),
            undetermined = annotated.count(Membership::Undetermined),
            "reconciled live schema"
        );

        annotated
    }

    fn evaluate(
        &self,
        live: &LiveTree,
        visit: &Visit<'_>,
    ) -> Result<(Membership, Vec<RuleNodeId>), FilterError> {
        let Some(node) = live.get(visit.id) else {
            return Err(FilterError::malformed_live_node(
                visit.id.to_string(),
                "node is not part of the live tree",
            ));
        };
        let kind = node.kind();
        let malformed =
            |reason: String| FilterError::malformed_live_node(live.display_path(visit.id), reason);

        let name = node
            .name()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| malformed(format!("{} has no name", kind)))?;

        let parent_kind = node.parent().and_then(|p| live.get(p)).map(|p| p.kind());
        if !can_appear_under(kind, parent_kind) {
            let reason = match parent_kind {
                Some(parent) => format!("{} cannot appear under a {}", kind, parent),
                None => format!("{} cannot appear at the top level", kind),
            };
            return Err(malformed(reason));
        }

        let path = object_path(name, &visit.ancestors);
        let decision = self.evaluator.decide(&path, kind)?;

        let matches = match &self.matcher {
            Some(matcher) => matcher.matches(kind, name, &visit.ancestors),
            None => Vec::new(),
        };

        Ok((decision.into(), matches))
    }
}

/// Parent kinds a live object may have.
fn can_appear_under(kind: ObjectKind, parent: Option<ObjectKind>) -> bool {
    match kind {
        ObjectKind::Catalog => parent.is_none(),
        ObjectKind::Schema => matches!(parent, None | Some(ObjectKind::Catalog)),
        ObjectKind::Table | ObjectKind::Procedure => matches!(
            parent,
            None | Some(ObjectKind::Catalog) | Some(ObjectKind::Schema)
        ),
        ObjectKind::Column => parent == Some(ObjectKind::Table),
    }
}

fn object_path<'t>(name: &'t str, ancestors: &[ShapeLink<'t>]) -> ObjectPath<'t> {
    let mut path = ObjectPath::named(name);
    for link in ancestors {
        match link.kind {
            ObjectKind::Catalog => path.catalog = Some(link.name),
            ObjectKind::Schema => path.schema = Some(link.name),
            ObjectKind::Table => path.table = Some(link.name),
            ObjectKind::Column | ObjectKind::Procedure => {}
        }
    }
    path
}

/// Annotate a live tree against a compiled configuration.
pub fn reconcile(config: &FiltersConfig, live: &LiveTree) -> AnnotatedTree {
    Reconciler::new(config).reconcile(live)
}
