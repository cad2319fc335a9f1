//! `dbsift scaffold` - generate rules that include everything in a snapshot.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use dbsift_core::{LiveTree, RulesDefinition};
use dbsift_reconcile::scaffold_rules;

use super::Sources;

/// Rules document covering every table and procedure of `live`.
fn scaffold_definition(live: &LiveTree) -> RulesDefinition {
    scaffold_rules(live).to_definition()
}

pub fn run(sources: &Sources, output: Option<&Path>, force: bool) -> Result<()> {
    let live = sources.load_live()?;
    let definition = scaffold_definition(&live);
    if definition.is_empty() {
        eprintln!("⚠ The snapshot holds no named objects; the scaffolded rules are empty.");
    }
    let yaml = definition
        .to_yaml()
        .context("Failed to serialize scaffolded rules")?;

    match output {
        Some(path) => {
            if path.exists() && !force {
                anyhow::bail!("{:?} already exists. Use --force to overwrite.", path);
            }
            fs::write(path, &yaml).with_context(|| format!("Failed to write {:?}", path))?;
            println!("✅ Wrote rules for {} objects to {}", live.len(), path.display());
        }
        None => print!("{}", yaml),
    }

    Ok(())
}
