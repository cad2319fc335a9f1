//! `dbsift decide` - membership of a single object.

use anyhow::{Context, Result};

use dbsift_core::ObjectKind;
use dbsift_filter::{decide, Decision, ObjectPath};

use super::Sources;

pub fn run(
    sources: &Sources,
    kind: ObjectKind,
    name: &str,
    catalog: Option<&str>,
    schema: Option<&str>,
    table: Option<&str>,
) -> Result<()> {
    let rules = sources.load_rules()?;
    for warning in &rules.compilation.warnings {
        eprintln!("⚠ {}", warning);
    }

    let path = ObjectPath {
        catalog,
        schema,
        table,
        name: Some(name),
    };

    let decision = decide(&rules.compilation.config, &path, kind)
        .with_context(|| format!("Cannot decide {} {}", kind, path))?;

    let icon = match decision {
        Decision::Included => "✅",
        Decision::Excluded => "🚫",
    };
    println!("{} {} {}: {}", icon, kind, path, decision);

    Ok(())
}
