// SPDX-License-Identifier: MIT

//! Parse tree to reactive node graph
//!
//! One node per parse node, children first. Groups are transparent and
//! references come out unconnected.

use super::ast::{Literal, ParseNode, ParseNodeKind, ParseTree};
use super::evaluator::UnaryOperator;
use super::node::{ExpressionNode, NodeRef};
use super::parser::parse;
use super::types::Value;
use crate::error::SyntaxError;

/// Build a fresh node graph for a parse tree
pub fn compile(tree: &ParseTree) -> NodeRef {
    log::trace!("Compiling '{}' (height {})", tree.source, tree.root.height());
    compile_node(&tree.root)
}

/// Parse and compile in one step
pub fn compile_reactive_expression(source: &str) -> Result<NodeRef, SyntaxError> {
    let tree = parse(source)?;
    Ok(compile(&tree))
}

fn compile_node(node: &ParseNode) -> NodeRef {
    match &node.kind {
        ParseNodeKind::Group(inner) => compile_node(inner),
        ParseNodeKind::Not(operand) => {
            ExpressionNode::unary(UnaryOperator::Not, compile_node(operand), node.span)
        }
        ParseNodeKind::Negate(operand) => {
            ExpressionNode::unary(UnaryOperator::Negate, compile_node(operand), node.span)
        }
        ParseNodeKind::Binary { op, left, right } => {
            let left = compile_node(left);
            let right = compile_node(right);
            ExpressionNode::binary(*op, left, right, node.span)
        }
        ParseNodeKind::Reference(path) => ExpressionNode::reference(path.join("."), node.span),
        ParseNodeKind::Literal(Literal::Number(n)) => {
            ExpressionNode::literal(Value::Number(*n), node.span)
        }
        ParseNodeKind::Literal(Literal::Boolean(b)) => {
            ExpressionNode::literal(Value::Boolean(*b), node.span)
        }
    }
}
