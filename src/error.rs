//! Error types for value retrieval.

use std::fmt;

use crate::node::NodeId;

/// Errors surfaced when reading an anchor's value.
///
/// These are engine-level errors, distinct from user domain errors. A fallible
/// computation should carry its own `Result` in the anchor's value type (e.g.
/// an `Anchor<Result<T, MyError>>`) so that downstream anchors can react to
/// the failure like any other value change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The anchor is derived, is not observed, and has never been computed,
    /// so it has no value yet.
    ///
    /// Observing the anchor (or one of its dependants) before reading it
    /// guarantees a value is available.
    Uncomputed {
        /// Identifier of the anchor that has no value.
        node: NodeId,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Uncomputed { node } => {
                write!(f, "anchor {node:?} has never been computed; observe it before reading")
            }
        }
    }
}

impl std::error::Error for EngineError {}
