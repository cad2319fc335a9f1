//! Per-object filters built on top of [`PatternFilter`].

use crate::pattern::{Pattern, PatternFilter};

/// Filter for column names.
pub type ColumnFilter = PatternFilter;

/// Filter for procedure names.
pub type ProcedureFilter = PatternFilter;

/// An include-table rule, optionally carrying its own column rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeTableFilter {
    pattern: Pattern,
    columns: Option<ColumnFilter>,
}

impl IncludeTableFilter {
    pub fn new(pattern: Pattern, columns: Option<ColumnFilter>) -> Self {
        Self { pattern, columns }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Table-specific column rules. When present they replace the scope's column rules.
    pub fn columns(&self) -> Option<&ColumnFilter> {
        self.columns.as_ref()
    }

    pub fn matches(&self, table: &str) -> bool {
        self.pattern.matches(table)
    }
}

/// Table rules for one catalog/schema scope, with all applicable levels merged.
///
/// `includes` are ordered innermost level first so that the most specific column
/// override is found first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    includes: Vec<IncludeTableFilter>,
    excludes: Vec<Pattern>,
    columns: ColumnFilter,
}

impl TableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_include(&mut self, include: IncludeTableFilter) {
        self.includes.push(include);
    }

    pub fn add_exclude(&mut self, pattern: Pattern) {
        if !self.excludes.contains(&pattern) {
            self.excludes.push(pattern);
        }
    }

    /// Merge column rules into the scope's default column filter.
    pub fn merge_columns(&mut self, columns: &ColumnFilter) {
        self.columns.merge(columns);
    }

    pub fn includes(&self) -> &[IncludeTableFilter] {
        &self.includes
    }

    pub fn excludes(&self) -> &[Pattern] {
        &self.excludes
    }

    /// Column rules applied to tables without their own override.
    pub fn columns(&self) -> &ColumnFilter {
        &self.columns
    }

    pub fn is_included(&self, table: &str) -> bool {
        let included = self.includes.is_empty() || self.includes.iter().any(|i| i.matches(table));
        included && !self.excludes.iter().any(|p| p.matches(table))
    }

    /// The column filter that governs `table`.
    ///
    /// The first matching include carrying column rules wins and is used on its own;
    /// otherwise the scope's default column filter applies.
    pub fn column_filter(&self, table: &str) -> &ColumnFilter {
        self.includes
            .iter()
            .filter(|include| include.matches(table))
            .find_map(IncludeTableFilter::columns)
            .unwrap_or(&self.columns)
    }

    pub fn is_column_included(&self, table: &str, column: &str) -> bool {
        self.column_filter(table).is_included(column)
    }
}
