//! CLI command implementations for dbsift.

pub mod check;
pub mod decide;
pub mod reconcile;
pub mod scaffold;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use dbsift_core::{DbsiftConfig, LiveTree, RuleTree, RulesDefinition, SchemaSnapshot};
use dbsift_filter::{compile, Compilation};

/// Where rules and snapshots come from.
///
/// Explicit `--rules` / `--snapshot` paths win over the project file.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    config: Option<PathBuf>,
    rules: Option<PathBuf>,
    snapshot: Option<PathBuf>,
}

/// Compiled rules together with the tree they came from.
pub struct LoadedRules {
    pub tree: RuleTree,
    pub compilation: Compilation,
    /// File the rules were read from, for reporting.
    pub origin: Option<PathBuf>,
}

impl Sources {
    pub fn new(
        config: Option<PathBuf>,
        rules: Option<PathBuf>,
        snapshot: Option<PathBuf>,
    ) -> Self {
        Self {
            config,
            rules,
            snapshot,
        }
    }

    fn project(&self) -> Result<Option<DbsiftConfig>> {
        match &self.config {
            Some(path) => {
                let config = DbsiftConfig::load_with_context(path)
                    .with_context(|| format!("Failed to load configuration from {:?}", path))?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    /// Load the rules document.
    pub fn rules_definition(&self) -> Result<(RulesDefinition, Option<PathBuf>)> {
        if let Some(path) = &self.rules {
            let definition = RulesDefinition::from_file(path)
                .with_context(|| format!("Failed to read rules file {:?}", path))?;
            return Ok((definition, Some(path.clone())));
        }

        match self.project()? {
            Some(config) => {
                let origin = config.rules_file.clone().or_else(|| self.config.clone());
                Ok((config.rules_or_default(), origin))
            }
            None => {
                anyhow::bail!("No rules given. Pass --rules or --config (or set DBSIFT_RULES)")
            }
        }
    }

    /// Load and compile the rules.
    pub fn load_rules(&self) -> Result<LoadedRules> {
        let (definition, origin) = self.rules_definition()?;
        let tree = RuleTree::from_definition(&definition);
        let compilation = compile(&tree);
        tracing::debug!(
            rules = tree.len(),
            warnings = compilation.warnings.len(),
            "compiled rules"
        );
        Ok(LoadedRules {
            tree,
            compilation,
            origin,
        })
    }

    /// Snapshot path from `--snapshot` or the project file, if any.
    pub fn snapshot_path(&self) -> Result<Option<PathBuf>> {
        match &self.snapshot {
            Some(path) => Ok(Some(path.clone())),
            None => Ok(self.project()?.and_then(|config| config.snapshot_file)),
        }
    }

    /// Load the schema snapshot as a live tree.
    pub fn load_live(&self) -> Result<LiveTree> {
        let path = self.snapshot_path()?.context(
            "No snapshot given. Pass --snapshot or set snapshot_file in the project file",
        )?;
        let snapshot = load_snapshot(&path)?;
        tracing::debug!(path = %path.display(), objects = snapshot.objects.len(), "loaded snapshot");
        Ok(LiveTree::from(&snapshot))
    }
}

fn load_snapshot(path: &Path) -> Result<SchemaSnapshot> {
    SchemaSnapshot::from_file(path).with_context(|| format!("Failed to read snapshot {:?}", path))
}
