//! `dbsift check` command implementation.
//!
//! Compiles the rules and reports everything the compiler had to recover from:
//! - invalid regular expressions (errors)
//! - malformed rule nesting (warnings)
//!
//! When a snapshot is available the rules are also reconciled against it, reporting
//! malformed discovered objects and rules that describe nothing in the snapshot.

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;

use dbsift_core::{LiveTree, RuleNodeId};
use dbsift_filter::FilterError;
use dbsift_reconcile::Reconciler;

use super::{LoadedRules, Sources};

// ============================================================================
// Check Result Types
// ============================================================================

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational message.
    Info,
    /// Warning - the rules still compile but part of them is ignored.
    Warning,
    /// Error - a rule is unusable.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Category of the check that produced this finding.
    pub category: String,
    pub message: String,
    /// File the finding refers to.
    pub file: Option<PathBuf>,
    /// Location within the rules (e.g. "root / catalog SALES").
    pub location: Option<String>,
}

impl CheckFinding {
    fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            file: None,
            location: None,
        }
    }

    fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    fn warning(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    fn info(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, message)
    }

    fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Map a recovered filter error to a finding.
    fn from_filter_error(error: &FilterError) -> Self {
        match error {
            FilterError::InvalidPattern {
                pattern,
                location,
                message,
            } => Self::error(
                error.category(),
                format!("'{}' is not a valid pattern: {}", pattern, message),
            )
            .with_location(location.clone()),
            FilterError::MalformedRuleTree { location, reason } => {
                Self::warning(error.category(), format!("{} (ignored)", reason))
                    .with_location(location.clone())
            }
            FilterError::MalformedLiveNode { node, reason } => {
                Self::warning(error.category(), reason.clone()).with_location(node.clone())
            }
        }
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, finding: CheckFinding) {
        self.findings.push(finding);
    }

    fn extend(&mut self, findings: impl IntoIterator<Item = CheckFinding>) {
        self.findings.extend(findings);
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Print human-readable summary.
    pub fn print_summary(&self) {
        let sections = [
            (Severity::Error, "❌ Errors"),
            (Severity::Warning, "⚠️  Warnings"),
            (Severity::Info, "ℹ️  Info"),
        ];

        for (severity, title) in sections {
            let mut findings: Vec<_> = self
                .findings
                .iter()
                .filter(|f| f.severity == severity)
                .collect();
            if findings.is_empty() {
                continue;
            }
            findings.sort_by(|a, b| a.category.cmp(&b.category));

            println!("\n{} ({}):", title, findings.len());
            println!("{}", "─".repeat(60));
            for finding in findings {
                print_finding(finding);
            }
        }

        let errors = self.count(Severity::Error);
        let warnings = self.count(Severity::Warning);

        println!();
        println!("{}", "═".repeat(60));
        if errors == 0 && warnings == 0 {
            println!("✅ All checks passed!");
        } else {
            println!("Summary: {} error(s), {} warning(s)", errors, warnings);
            if errors > 0 {
                println!("\n❌ Rules have errors that must be fixed.");
            }
        }
    }
}

fn print_finding(finding: &CheckFinding) {
    let icon = match finding.severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
        Severity::Info => "ℹ",
    };

    let location = match (&finding.file, &finding.location) {
        (Some(f), Some(l)) => format!(" [{}: {}]", f.display(), l),
        (Some(f), None) => format!(" [{}]", f.display()),
        (None, Some(l)) => format!(" [{}]", l),
        (None, None) => String::new(),
    };

    println!(
        "  {} [{}]{}: {}",
        icon, finding.category, location, finding.message
    );
}

// ============================================================================
// Checks
// ============================================================================

/// Findings from compiling the rules.
fn check_compilation(rules: &LoadedRules) -> Vec<CheckFinding> {
    let mut findings: Vec<CheckFinding> = rules
        .compilation
        .warnings
        .iter()
        .map(|w| CheckFinding::from_filter_error(w).with_file(rules.origin.clone()))
        .collect();

    if rules.tree.is_empty() {
        findings.push(
            CheckFinding::info("empty_rules", "no rules defined; every object is included")
                .with_file(rules.origin.clone()),
        );
    }

    findings
}

/// Findings from reconciling the rules against a snapshot.
fn check_against_snapshot(rules: &LoadedRules, live: &LiveTree) -> Vec<CheckFinding> {
    let annotated = Reconciler::new(&rules.compilation.config)
        .with_rules(&rules.tree)
        .reconcile(live);

    let mut findings: Vec<CheckFinding> = annotated
        .warnings
        .iter()
        .map(CheckFinding::from_filter_error)
        .collect();

    let matched: HashSet<RuleNodeId> = annotated
        .iter()
        .flat_map(|node| node.matches.iter().copied())
        .collect();

    for id in rules.tree.ids() {
        let Some(node) = rules.tree.node(id) else {
            continue;
        };
        if node.label().is_none() || matched.contains(&id) {
            continue;
        }
        findings.push(
            CheckFinding::info("unused_rule", format!("{} matches nothing in the snapshot", node))
                .with_file(rules.origin.clone())
                .with_location(rules.tree.location(id)),
        );
    }

    findings
}

/// Run all checks and return the results without printing them.
pub fn run_quiet(sources: &Sources) -> Result<CheckResults> {
    let rules = sources.load_rules()?;

    let mut results = CheckResults::new();
    results.extend(check_compilation(&rules));

    if sources.snapshot_path()?.is_some() {
        let live = sources.load_live()?;
        results.extend(check_against_snapshot(&rules, &live));
    } else {
        results.add(CheckFinding::info(
            "snapshot",
            "no snapshot configured; skipped reconciliation checks",
        ));
    }

    Ok(results)
}

/// Run all checks and print the findings.
pub fn run(sources: &Sources) -> Result<()> {
    println!("🔍 Checking dbsift rules...");

    let results = run_quiet(sources)?;
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!(
            "Rules have {} error(s). Fix them before using them.",
            results.count(Severity::Error)
        );
    }

    Ok(())
}
