// SPDX-License-Identifier: MIT

//! Parse tree for trigger expressions
//!
//! Grammar-shaped: one node per production. Groups are kept here so the
//! tree mirrors the source; the compiler drops them.

use super::evaluator::BinaryOperator;
use std::fmt;

/// Byte range in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Result of a successful parse
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree {
    pub source: String,
    pub root: ParseNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    pub kind: ParseNodeKind,
    pub span: Span,
    height: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseNodeKind {
    /// `( expression )`
    Group(Box<ParseNode>),
    /// `! operand`
    Not(Box<ParseNode>),
    /// `- operand`
    Negate(Box<ParseNode>),
    /// `left op right`
    Binary {
        op: BinaryOperator,
        left: Box<ParseNode>,
        right: Box<ParseNode>,
    },
    /// Dotted path, one entry per identifier
    Reference(Vec<String>),
    Literal(Literal),
}

/// Literal values in expressions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Number(f64),
    Boolean(bool),
}

impl ParseNode {
    pub fn new(kind: ParseNodeKind, span: Span) -> Self {
        let height = match &kind {
            ParseNodeKind::Group(inner)
            | ParseNodeKind::Not(inner)
            | ParseNodeKind::Negate(inner) => inner.height + 1,
            ParseNodeKind::Binary { left, right, .. } => left.height.max(right.height) + 1,
            ParseNodeKind::Reference(_) | ParseNodeKind::Literal(_) => 1,
        };
        Self { kind, span, height }
    }

    /// Number of nodes on the longest path from here to a leaf
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn binary(op: BinaryOperator, left: ParseNode, right: ParseNode) -> Self {
        let span = left.span.to(right.span);
        Self::new(
            ParseNodeKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }
}

/// Fully parenthesized rendering, mostly useful in diagnostics and tests
impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseNodeKind::Group(inner) => write!(f, "({})", inner),
            ParseNodeKind::Not(operand) => write!(f, "!{}", operand),
            ParseNodeKind::Negate(operand) => write!(f, "-{}", operand),
            ParseNodeKind::Binary { op, left, right } => write!(f, "[{} {} {}]", left, op, right),
            ParseNodeKind::Reference(path) => write!(f, "{}", path.join(".")),
            ParseNodeKind::Literal(Literal::Number(n)) => write!(f, "{}", n),
            ParseNodeKind::Literal(Literal::Boolean(b)) => write!(f, "{}", b),
        }
    }
}
