//! Object kinds shared by rule trees and live schema trees.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a database object.
///
/// Rule nodes use the same enum as their kind family, so an `IncludeTable` and an
/// `ExcludeTable` both belong to [`ObjectKind::Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// JDBC-level catalog.
    Catalog,
    /// Schema, nested in a catalog (or standalone).
    Schema,
    /// Table.
    Table,
    /// Column of a table.
    Column,
    /// Stored procedure or function.
    Procedure,
}

impl ObjectKind {
    /// Catalogs and schemas are namespaces; everything else is a leaf object.
    pub fn is_container(self) -> bool {
        matches!(self, ObjectKind::Catalog | ObjectKind::Schema)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Catalog => write!(f, "catalog"),
            ObjectKind::Schema => write!(f, "schema"),
            ObjectKind::Table => write!(f, "table"),
            ObjectKind::Column => write!(f, "column"),
            ObjectKind::Procedure => write!(f, "procedure"),
        }
    }
}

impl std::str::FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "catalog" => Ok(ObjectKind::Catalog),
            "schema" => Ok(ObjectKind::Schema),
            "table" => Ok(ObjectKind::Table),
            "column" => Ok(ObjectKind::Column),
            "procedure" | "function" => Ok(ObjectKind::Procedure),
            other => Err(format!("unknown object kind '{}'", other)),
        }
    }
}

/// Whether a rule pulls objects in or pushes them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Include,
    Exclude,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Include => write!(f, "include"),
            Polarity::Exclude => write!(f, "exclude"),
        }
    }
}
