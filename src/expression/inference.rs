// SPDX-License-Identifier: MIT

//! Static type inference over a compiled node graph
//!
//! Operators push their operand types down onto untyped children, mostly so
//! that references learn the type to request from the blackboard. Conflicts
//! are reported, not fatal.

use super::ast::Span;
use super::node::{NodeKind, NodeRef};
use super::types::DataType;
use std::fmt;

/// A child whose static type disagrees with what its operator needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeWarning {
    pub span: Span,
    pub node: String,
    pub expected: DataType,
    pub found: DataType,
}

impl fmt::Display for TypeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} is {}, expected {}",
            self.node, self.span, self.found, self.expected
        )
    }
}

/// Assign types in place; an untyped root becomes Boolean.
pub fn infer(root: &NodeRef) -> Vec<TypeWarning> {
    let mut warnings = Vec::new();
    root.traverse(&mut |node| constrain(node, &mut warnings));
    if !root.data_type().is_concrete() {
        root.set_data_type(DataType::Boolean);
    }
    warnings
}

fn constrain(node: &NodeRef, warnings: &mut Vec<TypeWarning>) {
    match node.kind() {
        NodeKind::Unary(unary) => {
            for operand in node.operands() {
                force(&operand, unary.op().operand_type(), warnings);
            }
        }
        NodeKind::Binary(binary) => {
            let operands = node.operands();
            let [left, right] = operands.as_slice() else {
                return;
            };
            match binary.op().operand_type() {
                Some(expected) => {
                    force(left, expected, warnings);
                    force(right, expected, warnings);
                }
                // equality: one concrete side decides for the other
                None => {
                    if left.data_type().is_concrete() {
                        force(right, left.data_type(), warnings);
                    } else if right.data_type().is_concrete() {
                        force(left, right.data_type(), warnings);
                    }
                }
            }
        }
        NodeKind::Literal(_) | NodeKind::Reference(_) => {}
    }
}

fn force(node: &NodeRef, expected: DataType, warnings: &mut Vec<TypeWarning>) {
    let found = node.data_type();
    if !found.is_concrete() {
        node.set_data_type(expected);
    } else if found != expected {
        let warning = TypeWarning {
            span: node.span(),
            node: node.label(),
            expected,
            found,
        };
        log::warn!("Type mismatch: {}", warning);
        warnings.push(warning);
    }
}
