//! # dbsift-reconcile
//!
//! Reconciliation of compiled filters against a discovered schema:
//! - [`Reconciler`]: annotates every live node as included, excluded or undetermined
//! - [`ShapeMatcher`]: finds the rule nodes that describe a live node
//! - [`scaffold_rules`] and [`adopt`]: build rule trees from discovered objects

pub mod annotated;
pub mod matcher;
pub mod reconciler;
pub mod scaffold;

pub use annotated::{AnnotatedNode, AnnotatedTree};
pub use matcher::{ShapeLink, ShapeMatcher};
pub use reconciler::{reconcile, Reconciler};
pub use scaffold::{adopt, scaffold_rules, ScaffoldError};
