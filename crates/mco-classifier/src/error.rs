//! Error types for classification and authorization loading.

use mco_model::{Date, GhmRootCode, ModelError};
use thiserror::Error;

/// Reasons a cluster of stays could not be classified.
///
/// These never abort a batch: the driver turns them into error codes and an
/// error GHM for the affected cluster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyFailure {
    /// No table index covers the discharge date of the cluster.
    #[error("no table index available on {date}")]
    NoTableIndex { date: Date },

    /// Classification was asked for a cluster without records.
    #[error("empty cluster")]
    EmptyCluster,

    /// A test returned a child outside the node's children.
    #[error("result {result} of test {function} at node {node} is out of range (0 - {children})")]
    InvalidTestResult {
        function: u8,
        node: usize,
        result: i32,
        children: usize,
    },

    /// Unknown test function, or known function with unsupported parameters.
    #[error("unknown test {function} or invalid arguments at node {node}")]
    UnknownTest { function: u8, node: usize },

    /// The tree ended on a GHM whose root is missing from the root table.
    #[error("unknown GHM root '{root}'")]
    UnknownGhmRoot { root: GhmRootCode },

    /// The walk visited as many nodes as the tree holds without reaching a leaf.
    #[error("empty GHM tree or infinite loop ({nodes} nodes)")]
    IterationCap { nodes: usize },

    /// A child index points past the end of the tree.
    #[error("GHM tree node {node} does not exist ({nodes} nodes)")]
    NodeOutOfRange { node: usize, nodes: usize },
}

/// Result type alias for classification steps.
pub type Result<T> = std::result::Result<T, ClassifyFailure>;

impl ClassifyFailure {
    /// Error category and code recorded for this failure.
    pub fn error_code(&self) -> (u8, u16) {
        match self {
            Self::NoTableIndex { .. } => (3, 502),
            _ => (3, 4),
        }
    }

    /// Test function involved in the failure, if any.
    pub fn function(&self) -> Option<u8> {
        match *self {
            Self::InvalidTestResult { function, .. } | Self::UnknownTest { function, .. } => {
                Some(function)
            }
            _ => None,
        }
    }

    /// Tree node involved in the failure, if any.
    pub fn node(&self) -> Option<usize> {
        match *self {
            Self::InvalidTestResult { node, .. }
            | Self::UnknownTest { node, .. }
            | Self::NodeOutOfRange { node, .. } => Some(node),
            _ => None,
        }
    }
}

/// Errors raised while loading an authorization set.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("invalid authorization JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid authorization type '{value}'")]
    InvalidType { value: String },

    #[error("invalid unit code '{value}'")]
    InvalidUnit { value: String },

    #[error(transparent)]
    InvalidDate(#[from] ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes() {
        let date = Date::parse("2017-01-01").unwrap();
        assert_eq!(ClassifyFailure::NoTableIndex { date }.error_code(), (3, 502));
        assert_eq!(ClassifyFailure::IterationCap { nodes: 3 }.error_code(), (3, 4));
    }

    #[test]
    fn test_failure_context() {
        let err = ClassifyFailure::InvalidTestResult {
            function: 22,
            node: 4,
            result: 2,
            children: 2,
        };
        assert_eq!(err.function(), Some(22));
        assert_eq!(err.node(), Some(4));
        assert_eq!(
            format!("{err}"),
            "result 2 of test 22 at node 4 is out of range (0 - 2)"
        );
        assert_eq!(ClassifyFailure::IterationCap { nodes: 3 }.node(), None);
    }
}
