//! Error types for filter compilation and evaluation.
//!
//! None of these errors is fatal: the compiler and the reconciler recover locally and
//! hand the errors back as warnings next to their result.

use serde::Serialize;
use thiserror::Error;

/// Errors recovered while compiling rules or evaluating live objects.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterError {
    /// A rule string is not a valid regular expression.
    #[error("invalid pattern '{pattern}' at {location}: {message}")]
    InvalidPattern {
        pattern: String,
        location: String,
        message: String,
    },

    /// Structurally invalid rule nesting or a rule without a pattern.
    #[error("malformed rule tree at {location}: {reason}")]
    MalformedRuleTree { location: String, reason: String },

    /// A live schema node is missing required identity fields.
    #[error("malformed live node {node}: {reason}")]
    MalformedLiveNode { node: String, reason: String },
}

impl FilterError {
    pub fn invalid_pattern(
        pattern: impl Into<String>,
        location: impl Into<String>,
        source: &regex::Error,
    ) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            location: location.into(),
            message: source.to_string(),
        }
    }

    pub fn malformed_rule_tree(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRuleTree {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_live_node(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedLiveNode {
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// Short category name, used for grouping findings.
    pub fn category(&self) -> &'static str {
        match self {
            FilterError::InvalidPattern { .. } => "invalid_pattern",
            FilterError::MalformedRuleTree { .. } => "malformed_rule_tree",
            FilterError::MalformedLiveNode { .. } => "malformed_live_node",
        }
    }
}
