// SPDX-License-Identifier: MIT

//! Typed error handling for trigger-rs
//!
//! Every failure the library can report lives here: syntax errors from the
//! parser, lifecycle violations from the node model, lookup failures from
//! the blackboard, and the top-level `TriggerError` that wraps them.

use crate::expression::DataType;
use thiserror::Error;

/// Top-level error type for trigger-rs
#[derive(Debug, Error)]
pub enum TriggerError {
    /// Malformed trigger source text
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A referenced name could not be bound to a blackboard value
    #[error("Binding error: {0}")]
    Binding(#[from] BlackboardError),

    /// Node lifecycle violation (a bug in the wiring code)
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    /// Source text changed while live connections exist
    #[error("Cannot recompile '{code}' while the trigger is linked")]
    CompileWhileLinked { code: String },

    /// The trigger was used before a successful compile
    #[error("Trigger '{code}' is not compiled")]
    NotCompiled { code: String },

    /// Two triggers registered under the same id
    #[error("Trigger '{id}' is already registered")]
    DuplicateTrigger { id: String },

    /// Configuration errors (bad definition file, bad CLI value)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl TriggerError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a duplicate trigger error
    pub fn duplicate(id: impl Into<String>) -> Self {
        Self::DuplicateTrigger { id: id.into() }
    }
}

/// Syntax error raised by the parser.
///
/// `offset` is a byte offset into the source; `line` and `column` are
/// 1-based. `expected` is sorted and de-duplicated.
/// An empty `expected` list means no token would have helped, as when the
/// input nests too deep.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Syntax error at line {line}, column {column}: unexpected {found}{}", expected_suffix(.expected))]
pub struct SyntaxError {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub found: String,
    pub expected: Vec<String>,
}

fn expected_suffix(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(", expected one of: {}", expected.join(", "))
    }
}

/// Lifecycle and invariant violations in the expression node model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// A reference was connected twice without a disconnect in between
    #[error("Reference '{name}' is already connected")]
    AlreadyConnected { name: String },

    /// A reference was evaluated before being connected
    #[error("Reference '{name}' is not connected")]
    NotConnected { name: String },

    /// An operator node was evaluated while its operands are disconnected
    #[error("{node} node was evaluated without its operands connected")]
    MissingOperand { node: String },

    /// An operator node was connected while it still owns children
    #[error("{node} node is already connected to its operands")]
    OperandsAlreadyConnected { node: String },

    /// `connect` was called with the wrong kind of target for this node
    #[error("{node} node cannot be connected this way")]
    WrongConnection { node: String },
}

/// Blackboard lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlackboardError {
    /// Name is not declared and the blackboard does not create entries on demand
    #[error("Unknown blackboard name '{name}'")]
    UnknownName { name: String },

    /// Declared and requested types disagree
    #[error("Blackboard name '{name}' is declared as {declared}, requested as {requested}")]
    TypeMismatch {
        name: String,
        declared: DataType,
        requested: DataType,
    },
}
