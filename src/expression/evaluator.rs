//! Operator semantics
//!
//! Pure transforms applied by unary and binary expression nodes. Arithmetic
//! follows IEEE-754, so division by zero yields `inf` or `NaN` rather than
//! an error.

use super::types::{DataType, Value};
use std::fmt;

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// !
    Not,
    /// -
    Negate,
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Equals,
    NotEquals,
    And,
    Or,
}

impl UnaryOperator {
    pub fn apply(self, operand: &Value) -> Value {
        match self {
            UnaryOperator::Not => Value::Boolean(!operand.is_truthy()),
            UnaryOperator::Negate => Value::Number(-operand.as_number()),
        }
    }

    /// Type the operand is expected to have
    pub fn operand_type(self) -> DataType {
        match self {
            UnaryOperator::Not => DataType::Boolean,
            UnaryOperator::Negate => DataType::Number,
        }
    }

    /// Type of the produced value
    pub fn result_type(self) -> DataType {
        self.operand_type()
    }

    pub fn name(self) -> &'static str {
        match self {
            UnaryOperator::Not => "Not",
            UnaryOperator::Negate => "Negate",
        }
    }
}

impl BinaryOperator {
    pub fn apply(self, left: &Value, right: &Value) -> Value {
        match self {
            BinaryOperator::Add => arithmetic(left, right, |a, b| a + b),
            BinaryOperator::Subtract => arithmetic(left, right, |a, b| a - b),
            BinaryOperator::Multiply => arithmetic(left, right, |a, b| a * b),
            BinaryOperator::Divide => arithmetic(left, right, |a, b| a / b),
            BinaryOperator::GreaterThan => compare_numbers(left, right, |a, b| a > b),
            BinaryOperator::GreaterOrEqual => compare_numbers(left, right, |a, b| a >= b),
            BinaryOperator::LessThan => compare_numbers(left, right, |a, b| a < b),
            BinaryOperator::LessOrEqual => compare_numbers(left, right, |a, b| a <= b),
            BinaryOperator::Equals => Value::Boolean(values_equal(left, right)),
            BinaryOperator::NotEquals => Value::Boolean(!values_equal(left, right)),
            BinaryOperator::And => Value::Boolean(left.is_truthy() && right.is_truthy()),
            BinaryOperator::Or => Value::Boolean(left.is_truthy() || right.is_truthy()),
        }
    }

    /// Type both operands are expected to have, or `None` for the
    /// polymorphic equality operators.
    pub fn operand_type(self) -> Option<DataType> {
        match self {
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterOrEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessOrEqual => Some(DataType::Number),
            BinaryOperator::And | BinaryOperator::Or => Some(DataType::Boolean),
            BinaryOperator::Equals | BinaryOperator::NotEquals => None,
        }
    }

    /// Type of the produced value
    pub fn result_type(self) -> DataType {
        match self {
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide => DataType::Number,
            _ => DataType::Boolean,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOperator::Add => "Add",
            BinaryOperator::Subtract => "Subtract",
            BinaryOperator::Multiply => "Multiply",
            BinaryOperator::Divide => "Divide",
            BinaryOperator::GreaterThan => "GreaterThan",
            BinaryOperator::GreaterOrEqual => "GreaterOrEqual",
            BinaryOperator::LessThan => "LessThan",
            BinaryOperator::LessOrEqual => "LessOrEqual",
            BinaryOperator::Equals => "Equals",
            BinaryOperator::NotEquals => "NotEquals",
            BinaryOperator::And => "And",
            BinaryOperator::Or => "Or",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "!"),
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::GreaterThan => write!(f, ">"),
            BinaryOperator::GreaterOrEqual => write!(f, ">="),
            BinaryOperator::LessThan => write!(f, "<"),
            BinaryOperator::LessOrEqual => write!(f, "<="),
            BinaryOperator::Equals => write!(f, "=="),
            BinaryOperator::NotEquals => write!(f, "!="),
            BinaryOperator::And => write!(f, "&&"),
            BinaryOperator::Or => write!(f, "||"),
        }
    }
}

fn arithmetic<F>(left: &Value, right: &Value, op: F) -> Value
where
    F: Fn(f64, f64) -> f64,
{
    Value::Number(op(left.as_number(), right.as_number()))
}

fn compare_numbers<F>(left: &Value, right: &Value, cmp: F) -> Value
where
    F: Fn(f64, f64) -> bool,
{
    Value::Boolean(cmp(left.as_number(), right.as_number()))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    left.strict_eq(right)
}
