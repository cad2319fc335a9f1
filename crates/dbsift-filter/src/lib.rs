//! # dbsift-filter
//!
//! Name filters for database import rules.
//!
//! The crate compiles a [`RuleTree`](dbsift_core::RuleTree) into an immutable
//! [`FiltersConfig`] and answers include/exclude questions against it:
//!
//! ```ignore
//! let compilation = compile(&tree);
//! for warning in &compilation.warnings {
//!     eprintln!("{}", warning);
//! }
//! let path = ObjectPath::named("ORDERS").in_catalog("SALES").in_schema("PUBLIC");
//! let decision = decide(&compilation.config, &path, ObjectKind::Table)?;
//! ```
//!
//! ## Precedence
//!
//! Rules from the root, the catalog and the schema of an object are merged: an object is
//! included when any applicable include matches (or no include exists at all) and no
//! applicable exclude matches. Column rules nested under an include-table rule are the
//! exception: they replace the scope's column rules for the matching tables.

pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod filters;
pub mod object;
pub mod pattern;

pub use compiler::{compile, Compilation, FiltersCompiler};
pub use error::FilterError;
pub use evaluator::{decide, Decision, Membership, MembershipEvaluator, ObjectPath};
pub use filters::{CatalogFilter, FiltersConfig, SchemaFilter};
pub use object::{ColumnFilter, IncludeTableFilter, ProcedureFilter, TableFilter};
pub use pattern::{Pattern, PatternFilter};
