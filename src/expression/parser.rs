//! Trigger expression parser
//!
//! Recursive descent over the token stream, one function per precedence
//! level. Binary operators are left-associative. Precedence, lowest first:
//!
//! - `||`
//! - `&&`
//! - `!=`
//! - `==`
//! - `>=` `<=`
//! - `>` `<`
//! - `+` `-`
//! - `*` `/`
//! - prefix `!` `-`
//! - literals, dotted references, `( expression )`
//!
//! Every token kind the parser tests for at the current position is recorded,
//! so a failure reports the full set of symbols that would have been
//! accepted there.
//!
//! Groups and prefix operators may nest at most `MAX_NESTING` deep, and no
//! parse tree grows taller than `MAX_HEIGHT`. Deeper input is a syntax error,
//! which keeps every later recursive pass over the tree within the stack.

use super::ast::{Literal, ParseNode, ParseNodeKind, ParseTree, Span};
use super::evaluator::BinaryOperator;
use super::lexer::{tokenize, Token, TokenKind};
use super::types::DataType;
use crate::error::SyntaxError;
use std::collections::BTreeSet;

/// Deepest run of open groups and prefix operators
pub const MAX_NESTING: usize = 64;

/// Tallest parse tree accepted, counted in nodes from root to leaf
pub const MAX_HEIGHT: usize = 256;

/// Binary operator levels, lowest precedence first
const LEVELS: &[&[(TokenKind, BinaryOperator)]] = &[
    &[(TokenKind::OrOr, BinaryOperator::Or)],
    &[(TokenKind::AndAnd, BinaryOperator::And)],
    &[(TokenKind::NotEqual, BinaryOperator::NotEquals)],
    &[(TokenKind::EqualEqual, BinaryOperator::Equals)],
    &[
        (TokenKind::GreaterEqual, BinaryOperator::GreaterOrEqual),
        (TokenKind::LessEqual, BinaryOperator::LessOrEqual),
    ],
    &[
        (TokenKind::Greater, BinaryOperator::GreaterThan),
        (TokenKind::Less, BinaryOperator::LessThan),
    ],
    &[
        (TokenKind::Plus, BinaryOperator::Add),
        (TokenKind::Minus, BinaryOperator::Subtract),
    ],
    &[
        (TokenKind::Star, BinaryOperator::Multiply),
        (TokenKind::Slash, BinaryOperator::Divide),
    ],
];

/// Parse a trigger expression string into a parse tree
pub fn parse(source: &str) -> Result<ParseTree, SyntaxError> {
    let mut parser = Parser::new(source);
    let root = parser.expression()?;
    if !parser.check(TokenKind::EndOfInput) {
        return Err(parser.error());
    }
    Ok(ParseTree {
        source: source.to_string(),
        root,
    })
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    expected: BTreeSet<&'static str>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            depth: 0,
            expected: BTreeSet::new(),
        }
    }

    fn peek(&self) -> &Token {
        // tokenize() always ends the stream with EndOfInput
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            true
        } else {
            self.expected.insert(kind.describe());
            false
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        self.expected.clear();
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        self.eat(kind).ok_or_else(|| self.error())
    }

    fn error(&self) -> SyntaxError {
        let token = self.peek();
        let (line, column) = line_column(self.source, token.start);
        SyntaxError {
            offset: token.start,
            line,
            column,
            found: token.found(),
            expected: self.expected.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn too_deep(&self, offset: usize, limit: &str) -> SyntaxError {
        let (line, column) = line_column(self.source, offset);
        SyntaxError {
            offset,
            line,
            column,
            found: limit.to_string(),
            expected: Vec::new(),
        }
    }

    /// Step one level into a group or prefix operator starting at `offset`
    fn enter(&mut self, offset: usize) -> Result<(), SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep(
                offset,
                &format!("nesting deeper than {} levels", MAX_NESTING),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Reject `node` if it is taller than `MAX_HEIGHT`, reporting at `offset`
    fn bounded(&self, node: ParseNode, offset: usize) -> Result<ParseNode, SyntaxError> {
        if node.height() > MAX_HEIGHT {
            return Err(self.too_deep(
                offset,
                &format!("expression taller than {} levels", MAX_HEIGHT),
            ));
        }
        Ok(node)
    }

    fn expression(&mut self) -> Result<ParseNode, SyntaxError> {
        self.binary(0)
    }

    fn binary(&mut self, level: usize) -> Result<ParseNode, SyntaxError> {
        let Some(operators) = LEVELS.get(level) else {
            return self.unary();
        };

        let mut left = self.binary(level + 1)?;
        loop {
            let at = self.peek().start;
            let Some(op) = self.operator(operators) else {
                break;
            };
            let right = self.binary(level + 1)?;
            left = self.bounded(ParseNode::binary(op, left, right), at)?;
        }
        Ok(left)
    }

    fn operator(&mut self, operators: &[(TokenKind, BinaryOperator)]) -> Option<BinaryOperator> {
        for (kind, op) in operators {
            if self.eat(*kind).is_some() {
                return Some(*op);
            }
        }
        None
    }

    fn unary(&mut self) -> Result<ParseNode, SyntaxError> {
        if let Some(token) = self.eat(TokenKind::Not) {
            let operand = self.prefixed(&token)?;
            let span = Span::new(token.start, operand.span.end);
            return self.bounded(
                ParseNode::new(ParseNodeKind::Not(Box::new(operand)), span),
                token.start,
            );
        }
        if let Some(token) = self.eat(TokenKind::Minus) {
            let operand = self.prefixed(&token)?;
            let span = Span::new(token.start, operand.span.end);
            return self.bounded(
                ParseNode::new(ParseNodeKind::Negate(Box::new(operand)), span),
                token.start,
            );
        }
        self.atomic()
    }

    fn prefixed(&mut self, operator: &Token) -> Result<ParseNode, SyntaxError> {
        self.enter(operator.start)?;
        let operand = self.unary();
        self.leave();
        operand
    }

    fn atomic(&mut self) -> Result<ParseNode, SyntaxError> {
        if let Some(token) = self
            .eat(TokenKind::Number)
            .or_else(|| self.eat(TokenKind::Boolean))
        {
            return self.literal(token);
        }
        if let Some(token) = self.eat(TokenKind::Identifier) {
            return self.reference(token);
        }
        if let Some(open) = self.eat(TokenKind::LeftParen) {
            self.enter(open.start)?;
            let inner = self.expression();
            self.leave();
            let inner = inner?;
            let close = self.expect(TokenKind::RightParen)?;
            return self.bounded(
                ParseNode::new(
                    ParseNodeKind::Group(Box::new(inner)),
                    Span::new(open.start, close.end),
                ),
                open.start,
            );
        }
        Err(self.error())
    }

    fn literal(&self, token: Token) -> Result<ParseNode, SyntaxError> {
        let literal = match token.data_type {
            DataType::Number => Literal::Number(token.value.parse().map_err(|_| self.error())?),
            DataType::Boolean => Literal::Boolean(token.value == "true"),
            _ => return Err(self.error()),
        };
        Ok(ParseNode::new(
            ParseNodeKind::Literal(literal),
            Span::new(token.start, token.end),
        ))
    }

    fn reference(&mut self, first: Token) -> Result<ParseNode, SyntaxError> {
        let start = first.start;
        let mut end = first.end;
        let mut path = vec![first.value];
        while self.eat(TokenKind::Dot).is_some() {
            let segment = self.expect(TokenKind::Identifier)?;
            end = segment.end;
            path.push(segment.value);
        }
        Ok(ParseNode::new(
            ParseNodeKind::Reference(path),
            Span::new(start, end),
        ))
    }
}

/// 1-based line and column of a byte offset
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
