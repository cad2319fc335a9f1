//! Compiled, read-only filter configuration.

use crate::object::{ProcedureFilter, TableFilter};

/// Rules compiled for every catalog/schema combination the rule tree can address.
///
/// Values of this type never reference the rule tree they were compiled from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiltersConfig {
    catalogs: Vec<CatalogFilter>,
}

impl FiltersConfig {
    pub fn new(catalogs: Vec<CatalogFilter>) -> Self {
        Self { catalogs }
    }

    pub fn catalogs(&self) -> &[CatalogFilter] {
        &self.catalogs
    }

    /// Find the catalog entry for a live catalog name.
    ///
    /// An exact named entry wins; otherwise the wildcard entry (if any) applies.
    pub fn catalog(&self, name: Option<&str>) -> Option<&CatalogFilter> {
        lookup(&self.catalogs, name, CatalogFilter::name)
    }

    /// Find the schema entry for a live catalog/schema pair.
    pub fn resolve(&self, catalog: Option<&str>, schema: Option<&str>) -> Option<&SchemaFilter> {
        self.catalog(catalog).and_then(|c| c.schema(schema))
    }
}

/// Rules for one catalog (or the wildcard catalog when `name` is `None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFilter {
    name: Option<String>,
    schemas: Vec<SchemaFilter>,
}

impl CatalogFilter {
    pub fn new(name: Option<String>, schemas: Vec<SchemaFilter>) -> Self {
        Self { name, schemas }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn schemas(&self) -> &[SchemaFilter] {
        &self.schemas
    }

    /// Find the schema entry for a live schema name (exact match, then wildcard).
    pub fn schema(&self, name: Option<&str>) -> Option<&SchemaFilter> {
        lookup(&self.schemas, name, SchemaFilter::name)
    }
}

/// Ready-to-query rules for one catalog/schema scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFilter {
    name: Option<String>,
    tables: TableFilter,
    procedures: ProcedureFilter,
}

impl SchemaFilter {
    pub fn new(name: Option<String>, tables: TableFilter, procedures: ProcedureFilter) -> Self {
        Self {
            name,
            tables,
            procedures,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn tables(&self) -> &TableFilter {
        &self.tables
    }

    pub fn procedures(&self) -> &ProcedureFilter {
        &self.procedures
    }
}

fn lookup<'a, T>(
    items: &'a [T],
    name: Option<&str>,
    name_of: impl Fn(&T) -> Option<&str>,
) -> Option<&'a T> {
    if let Some(name) = name {
        if let Some(found) = items.iter().find(|item| name_of(*item) == Some(name)) {
            return Some(found);
        }
    }
    items.iter().find(|item| name_of(*item).is_none())
}
