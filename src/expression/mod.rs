// SPDX-License-Identifier: MIT

//! Reactive trigger expressions
//!
//! Source text such as `quest.accepted && player.level >= 5` goes through
//! three stages:
//! - `parse` - tokenizer and recursive-descent parser producing a `ParseTree`
//! - `compile` - one live `ExpressionNode` per parse node, references unconnected
//! - `infer` - static types pushed down onto references, conflicts reported
//!
//! Once references are connected to observable values, the graph keeps its
//! root value current by propagating `(new, old)` changes bottom-up.

mod ast;
mod channel;
mod compiler;
mod evaluator;
mod inference;
mod lexer;
mod node;
mod parser;
mod types;

pub use ast::{Literal, ParseNode, ParseNodeKind, ParseTree, Span};
pub use channel::{ChangeChannel, Listener, Observable, Subscription};
pub use compiler::{compile, compile_reactive_expression};
pub use evaluator::{BinaryOperator, UnaryOperator};
pub use inference::{infer, TypeWarning};
pub use lexer::{tokenize, Token, TokenKind};
pub use node::{BinaryNode, ExpressionNode, NodeKind, NodeRef, ReferenceNode, UnaryNode};
pub use parser::parse;
pub use types::{DataType, Value};
