//! Typed failures of the import pipeline.
//!
//! They travel inside `anyhow::Error` like every other error in tessel, and
//! can be recovered with `downcast_ref::<ImportError>()`.
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// An input reference names no node of the graph.
    Resolution { reference: String, node: String },
    /// A rewrite expected a structure that is not there.
    PatternMismatch { node: String, expected: String },
    /// No translator and no generic fallback for an op.
    MissingTranslator { op: String, node: String },
    /// An attribute or tensor payload is absent or of the wrong kind.
    AttributeDecode { node: String, attr: String, reason: String },
}

impl ImportError {
    pub fn resolution(reference: impl Into<String>, node: impl Into<String>) -> ImportError {
        ImportError::Resolution { reference: reference.into(), node: node.into() }
    }

    pub fn pattern(node: impl Into<String>, expected: impl Into<String>) -> ImportError {
        ImportError::PatternMismatch { node: node.into(), expected: expected.into() }
    }

    pub fn missing_translator(op: impl Into<String>, node: impl Into<String>) -> ImportError {
        ImportError::MissingTranslator { op: op.into(), node: node.into() }
    }

    pub fn attribute(
        node: impl Into<String>,
        attr: impl Into<String>,
        reason: impl Into<String>,
    ) -> ImportError {
        ImportError::AttributeDecode { node: node.into(), attr: attr.into(), reason: reason.into() }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Resolution { reference, node } => {
                write!(f, "Node {node} refers to unknown input {reference}")
            }
            ImportError::PatternMismatch { node, expected } => {
                write!(f, "Node {node} does not match the expected pattern: {expected}")
            }
            ImportError::MissingTranslator { op, node } => {
                write!(f, "No translator for operator {op} (node {node})")
            }
            ImportError::AttributeDecode { node, attr, reason } => {
                write!(f, "Node {node}, attribute {attr}: {reason}")
            }
        }
    }
}

impl std::error::Error for ImportError {}
