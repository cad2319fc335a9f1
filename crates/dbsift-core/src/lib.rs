//! # dbsift-core
//!
//! Shared types for dbsift:
//! - [`config`]: rule documents and project configuration loaded from YAML
//! - [`rule_tree`]: the arena-backed rule tree the compiler consumes
//! - [`live`]: discovered schema objects and the live schema tree

pub mod config;
pub mod kind;
pub mod live;
pub mod rule_tree;

pub use config::{
    CatalogRules, ConfigError, DbsiftConfig, FilterRules, IncludeTableRule, IncludeTableSpec,
    RulesDefinition, SchemaRules,
};
pub use kind::{ObjectKind, Polarity};
pub use live::{DiscoveredObject, LiveNode, LiveNodeId, LiveTree, SchemaSnapshot};
pub use rule_tree::{RuleNode, RuleNodeId, RuleTree, RuleTreeNode, TreeError};
