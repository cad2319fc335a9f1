//! Shape matching between rule nodes and live nodes.
//!
//! A rule node and a live node describe the same object when
//! - both belong to the same kind family,
//! - the live name matches the rule label (containers compare literally, rules use their
//!   pattern), and
//! - the rule node's named ancestors appear, in order, among the live node's ancestors.
//!
//! The live chain may hold extra links. A table rule declared at the root therefore
//! matches a table that lives in `SALES.PUBLIC`.

use dbsift_core::{ObjectKind, RuleNodeId, RuleTree};
use dbsift_filter::Pattern;

/// One ancestor of a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeLink<'a> {
    pub kind: ObjectKind,
    pub name: &'a str,
}

impl<'a> ShapeLink<'a> {
    pub fn new(kind: ObjectKind, name: &'a str) -> Self {
        Self { kind, name }
    }
}

#[derive(Debug, Clone)]
enum Label {
    Literal(String),
    Pattern(Pattern),
}

impl Label {
    fn matches(&self, name: &str) -> bool {
        match self {
            Label::Literal(literal) => literal == name,
            Label::Pattern(pattern) => pattern.matches(name),
        }
    }
}

#[derive(Debug, Clone)]
struct Link {
    kind: ObjectKind,
    label: Label,
}

impl Link {
    fn matches(&self, live: &ShapeLink<'_>) -> bool {
        self.kind == live.kind && self.label.matches(live.name)
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    id: RuleNodeId,
    link: Link,
    /// Named ancestors, outermost first.
    chain: Vec<Link>,
}

/// Precomputed matcher over one rule tree.
#[derive(Debug, Clone)]
pub struct ShapeMatcher {
    candidates: Vec<Candidate>,
}

impl ShapeMatcher {
    /// Index every rule node that can take part in a match.
    ///
    /// Unnamed containers never match on their own and are skipped in ancestor chains.
    /// Rules whose pattern (or an ancestor's pattern) does not compile are left out.
    pub fn new(rules: &RuleTree) -> Self {
        let candidates: Vec<Candidate> = rules
            .ids()
            .filter_map(|id| {
                let link = link_for(rules, id)?;
                let mut chain = Vec::new();
                for ancestor in rules.ancestors(id) {
                    let Some(node) = rules.node(ancestor) else {
                        continue;
                    };
                    if node.label().is_none() {
                        continue;
                    }
                    chain.push(link_for(rules, ancestor)?);
                }
                chain.reverse();
                Some(Candidate { id, link, chain })
            })
            .collect();

        tracing::debug!(candidates = candidates.len(), "indexed rule shapes");
        Self { candidates }
    }

    /// Rule nodes describing the live object `name` of `kind` under `ancestors`
    /// (outermost first).
    pub fn matches(
        &self,
        kind: ObjectKind,
        name: &str,
        ancestors: &[ShapeLink<'_>],
    ) -> Vec<RuleNodeId> {
        let live = ShapeLink::new(kind, name);
        self.candidates
            .iter()
            .filter(|c| c.link.matches(&live) && is_subsequence(&c.chain, ancestors))
            .map(|c| c.id)
            .collect()
    }
}

fn link_for(rules: &RuleTree, id: RuleNodeId) -> Option<Link> {
    let node = rules.node(id)?;
    let kind = node.family()?;
    let label = if node.is_container() {
        Label::Literal(node.container_name()?.to_string())
    } else {
        let source = node.pattern()?;
        if source.trim().is_empty() {
            return None;
        }
        Label::Pattern(Pattern::new(source).ok()?)
    };
    Some(Link { kind, label })
}

/// Greedy in-order scan.
fn is_subsequence(rule_chain: &[Link], live_chain: &[ShapeLink<'_>]) -> bool {
    let mut live = live_chain.iter();
    rule_chain
        .iter()
        .all(|link| live.by_ref().any(|candidate| link.matches(candidate)))
}
