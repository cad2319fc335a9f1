//! `dbsift reconcile` - annotate a snapshot with memberships.

use anyhow::{Context, Result};
use clap::ValueEnum;

use dbsift_core::{LiveTree, RuleTree};
use dbsift_filter::Membership;
use dbsift_reconcile::{AnnotatedNode, AnnotatedTree, Reconciler};

use super::Sources;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented tree
    Text,
    /// Annotated nodes and warnings as JSON
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MembershipArg {
    Included,
    Excluded,
    Undetermined,
}

impl From<MembershipArg> for Membership {
    fn from(arg: MembershipArg) -> Self {
        match arg {
            MembershipArg::Included => Membership::Included,
            MembershipArg::Excluded => Membership::Excluded,
            MembershipArg::Undetermined => Membership::Undetermined,
        }
    }
}

pub fn run(
    sources: &Sources,
    format: OutputFormat,
    only: Option<MembershipArg>,
    show_matches: bool,
) -> Result<()> {
    let rules = sources.load_rules()?;
    let live = sources.load_live()?;

    let mut reconciler = Reconciler::new(&rules.compilation.config);
    if show_matches {
        reconciler = reconciler.with_rules(&rules.tree);
    }
    let mut annotated = reconciler.reconcile(&live);

    // Compile warnings come first, then the ones found on the live tree.
    let mut warnings = rules.compilation.warnings.clone();
    warnings.append(&mut annotated.warnings);
    annotated.warnings = warnings;

    let only = only.map(Membership::from);
    match format {
        OutputFormat::Text => {
            print!("{}", render_text(&live, &annotated, &rules.tree, only, show_matches));
        }
        OutputFormat::Json => {
            let nodes: Vec<&AnnotatedNode> = annotated
                .iter()
                .filter(|n| only.is_none_or(|m| n.membership == m))
                .collect();
            let output = serde_json::json!({
                "nodes": nodes,
                "warnings": annotated.warnings,
            });
            let rendered =
                serde_json::to_string_pretty(&output).context("Failed to serialize result")?;
            println!("{}", rendered);
        }
    }

    Ok(())
}

/// Render the annotated tree with one object per line, indented by depth.
fn render_text(
    live: &LiveTree,
    annotated: &AnnotatedTree,
    rules: &RuleTree,
    only: Option<Membership>,
    show_matches: bool,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    let mut stack: Vec<(dbsift_core::LiveNodeId, usize)> =
        live.roots().iter().rev().map(|&id| (id, 0)).collect();

    while let Some((id, depth)) = stack.pop() {
        for &child in live.children(id).iter().rev() {
            stack.push((child, depth + 1));
        }

        let Some(node) = annotated.get(id) else {
            continue;
        };
        if only.is_some_and(|m| node.membership != m) {
            continue;
        }

        let icon = match node.membership {
            Membership::Included => "+",
            Membership::Excluded => "-",
            Membership::Undetermined => "?",
        };
        let mut line = format!(
            "{}{} {} {}",
            "  ".repeat(depth),
            icon,
            node.kind,
            node.name.as_deref().unwrap_or("<unnamed>")
        );

        if show_matches && !node.matches.is_empty() {
            let locations: Vec<String> = node
                .matches
                .iter()
                .filter_map(|&rule| rules.node(rule).map(|n| n.to_string()))
                .collect();
            line.push_str(&format!("  <- {}", locations.join(", ")));
        }
        lines.push(line);
    }

    if !annotated.warnings.is_empty() {
        lines.push(String::new());
        lines.push(format!("⚠️  Warnings ({}):", annotated.warnings.len()));
        lines.extend(annotated.warnings.iter().map(|w| format!("  {}", w)));
    }

    lines.push(String::new());
    lines.push(format!(
        "{} included, {} excluded, {} undetermined",
        annotated.count(Membership::Included),
        annotated.count(Membership::Excluded),
        annotated.count(Membership::Undetermined)
    ));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbsift_core::{DiscoveredObject, ObjectKind, RulesDefinition};
    use dbsift_filter::compile;

    fn fixture() -> (LiveTree, RuleTree) {
        let live = LiveTree::from_objects(&[
            DiscoveredObject::new(ObjectKind::Table, "ORDERS").in_schema("PUBLIC"),
            DiscoveredObject::new(ObjectKind::Table, "TEMP_LOG").in_schema("PUBLIC"),
        ]);
        let rules = RuleTree::from_definition(
            &RulesDefinition::from_yaml("exclude_tables: [\"TEMP_.*\"]\n").unwrap(),
        );
        (live, rules)
    }

    #[test]
    fn test_render_text_tree() {
        let (live, rules) = fixture();
        let annotated = Reconciler::new(&compile(&rules).config)
            .with_rules(&rules)
            .reconcile(&live);

        let text = render_text(&live, &annotated, &rules, None, true);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "+ schema PUBLIC");
        assert_eq!(lines[1], "  + table ORDERS");
        assert_eq!(lines[2], "  - table TEMP_LOG  <- exclude table 'TEMP_.*'");
        assert!(text.ends_with("2 included, 1 excluded, 0 undetermined\n"));
    }

    #[test]
    fn test_render_text_only_filter() {
        let (live, rules) = fixture();
        let annotated = Reconciler::new(&compile(&rules).config).reconcile(&live);

        let text = render_text(&live, &annotated, &rules, Some(Membership::Excluded), false);
        assert_eq!(text.lines().next(), Some("  - table TEMP_LOG"));
    }

    #[test]
    fn test_render_text_lists_warnings() {
        let live = LiveTree::from_objects(&[DiscoveredObject {
            kind: ObjectKind::Table,
            name: None,
            catalog: None,
            schema: Some("PUBLIC".to_string()),
            table: None,
        }]);
        let rules = RuleTree::new();
        let annotated = Reconciler::new(&compile(&rules).config).reconcile(&live);

        let text = render_text(&live, &annotated, &rules, None, false);
        assert_eq!(
            text,
            "+ schema PUBLIC\n  ? table <unnamed>\n\n\
             ⚠️  Warnings (1):\n  malformed live node PUBLIC.?: table has no name\n\n\
             1 included, 0 excluded, 1 undetermined\n"
        );
    }
}
