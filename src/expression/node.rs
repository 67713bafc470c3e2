// SPDX-License-Identifier: MIT

//! Incrementally re-evaluated expression nodes
//!
//! A compiled expression is a tree of [`ExpressionNode`]s shared through
//! [`NodeRef`]. Operator nodes own their children and subscribe to their
//! change channels; each child holds only a weak handle back to its parent,
//! so dropping the root tears the whole tree down.
//!
//! When a reference's source changes, the change travels synchronously up
//! the tree. Each operator recomputes its result for the new and the old
//! operand value and notifies its own listeners only if the result moved.
//! Operator nodes store no value of their own; references keep the last
//! value they observed so that siblings read consistent operands while a
//! change is still propagating.

use super::ast::Span;
use super::channel::{ChangeChannel, Observable, Subscription};
use super::evaluator::{BinaryOperator, UnaryOperator};
use super::types::{DataType, Value};
use crate::error::NodeError;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Shared handle to an expression node
pub type NodeRef = Rc<ExpressionNode>;

pub struct ExpressionNode {
    kind: NodeKind,
    data_type: Cell<DataType>,
    span: Span,
}

/// The closed set of node variants
pub enum NodeKind {
    /// Constant; never changes and has no change channel
    Literal(Value),
    Reference(ReferenceNode),
    Unary(UnaryNode),
    Binary(BinaryNode),
}

pub struct ReferenceNode {
    name: String,
    channel: ChangeChannel,
    state: RefCell<ReferenceState>,
}

enum ReferenceState {
    Unconnected,
    Connected {
        last: Value,
        _subscription: Subscription,
    },
}

pub struct UnaryNode {
    op: UnaryOperator,
    channel: ChangeChannel,
    operand: RefCell<Option<ChildLink>>,
}

pub struct BinaryNode {
    op: BinaryOperator,
    channel: ChangeChannel,
    operands: RefCell<Option<(ChildLink, ChildLink)>>,
}

struct ChildLink {
    node: NodeRef,
    _subscription: Subscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Operand,
    Left,
    Right,
}

impl ReferenceNode {
    /// Dotted blackboard name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.state.borrow(), ReferenceState::Connected { .. })
    }
}

impl UnaryNode {
    pub fn op(&self) -> UnaryOperator {
        self.op
    }

    fn operand_node(&self) -> Option<NodeRef> {
        self.operand.borrow().as_ref().map(|link| Rc::clone(&link.node))
    }
}

impl BinaryNode {
    pub fn op(&self) -> BinaryOperator {
        self.op
    }

    fn operand_nodes(&self) -> Option<(NodeRef, NodeRef)> {
        self.operands
            .borrow()
            .as_ref()
            .map(|(left, right)| (Rc::clone(&left.node), Rc::clone(&right.node)))
    }
}

impl ExpressionNode {
    pub fn literal(value: Value, span: Span) -> NodeRef {
        let data_type = value.data_type();
        Rc::new(Self {
            kind: NodeKind::Literal(value),
            data_type: Cell::new(data_type),
            span,
        })
    }

    /// An unconnected reference leaf
    pub fn reference(name: impl Into<String>, span: Span) -> NodeRef {
        Rc::new(Self {
            kind: NodeKind::Reference(ReferenceNode {
                name: name.into(),
                channel: ChangeChannel::new(),
                state: RefCell::new(ReferenceState::Unconnected),
            }),
            data_type: Cell::new(DataType::Any),
            span,
        })
    }

    /// A unary node already connected to `operand`
    pub fn unary(op: UnaryOperator, operand: NodeRef, span: Span) -> NodeRef {
        let node = Rc::new(Self {
            kind: NodeKind::Unary(UnaryNode {
                op,
                channel: ChangeChannel::new(),
                operand: RefCell::new(None),
            }),
            data_type: Cell::new(op.result_type()),
            span,
        });
        node.attach_operand(operand);
        node
    }

    /// A binary node already connected to `left` and `right`
    pub fn binary(op: BinaryOperator, left: NodeRef, right: NodeRef, span: Span) -> NodeRef {
        let node = Rc::new(Self {
            kind: NodeKind::Binary(BinaryNode {
                op,
                channel: ChangeChannel::new(),
                operands: RefCell::new(None),
            }),
            data_type: Cell::new(op.result_type()),
            span,
        });
        node.attach_operands(left, right);
        node
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn data_type(&self) -> DataType {
        self.data_type.get()
    }

    pub fn set_data_type(&self, data_type: DataType) {
        self.data_type.set(data_type);
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Reference name, if this is a reference node
    pub fn reference_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Reference(reference) => Some(reference.name()),
            _ => None,
        }
    }

    /// Short description used in diagnostics: `Add`, `Reference(x)`, ...
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Literal(value) => format!("Literal({})", value),
            NodeKind::Reference(reference) => format!("Reference({})", reference.name),
            NodeKind::Unary(unary) => unary.op.name().to_string(),
            NodeKind::Binary(binary) => binary.op.name().to_string(),
        }
    }

    /// Children currently connected, left to right
    pub fn operands(&self) -> Vec<NodeRef> {
        match &self.kind {
            NodeKind::Unary(unary) => unary.operand_node().into_iter().collect(),
            NodeKind::Binary(binary) => binary
                .operand_nodes()
                .map(|(left, right)| vec![left, right])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Current value of this node.
    ///
    /// Fails when a reference is not connected to a source or an operator
    /// has lost its operands; both indicate a wiring bug upstream.
    pub fn get_value(&self) -> Result<Value, NodeError> {
        match &self.kind {
            NodeKind::Literal(value) => Ok(value.clone()),
            NodeKind::Reference(reference) => match &*reference.state.borrow() {
                ReferenceState::Connected { last, .. } => Ok(last.clone()),
                ReferenceState::Unconnected => Err(NodeError::NotConnected {
                    name: reference.name.clone(),
                }),
            },
            NodeKind::Unary(unary) => {
                let operand = unary.operand_node().ok_or_else(|| self.missing_operand())?;
                Ok(unary.op.apply(&operand.get_value()?))
            }
            NodeKind::Binary(binary) => {
                let (left, right) = binary
                    .operand_nodes()
                    .ok_or_else(|| self.missing_operand())?;
                let left = left.get_value()?;
                let right = right.get_value()?;
                Ok(binary.op.apply(&left, &right))
            }
        }
    }

    /// Listen for `(new, old)` result changes. Literals never change, so
    /// subscribing to one returns an inert subscription.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Value, &Value) + 'static,
    {
        match self.channel() {
            Some(channel) => channel.subscribe(listener),
            None => Subscription::inert(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.channel().map_or(0, ChangeChannel::listener_count)
    }

    /// Connect a reference to its source. A reference has at most one
    /// source; connecting twice without `disconnect` is an error.
    pub fn connect_source(self: &Rc<Self>, source: Rc<dyn Observable>) -> Result<(), NodeError> {
        let NodeKind::Reference(reference) = &self.kind else {
            return Err(NodeError::WrongConnection { node: self.label() });
        };
        if reference.is_connected() {
            return Err(NodeError::AlreadyConnected {
                name: reference.name.clone(),
            });
        }

        let parent = Rc::downgrade(self);
        let subscription = source.subscribe(Box::new(move |new, old| {
            if let Some(node) = parent.upgrade() {
                node.on_source_changed(new, old);
            }
        }));
        reference.state.replace(ReferenceState::Connected {
            last: source.get_value(),
            _subscription: subscription,
        });
        Ok(())
    }

    /// Reconnect a disconnected unary node
    pub fn connect_operand(self: &Rc<Self>, operand: NodeRef) -> Result<(), NodeError> {
        match &self.kind {
            NodeKind::Unary(unary) if unary.operand.borrow().is_some() => {
                Err(NodeError::OperandsAlreadyConnected { node: self.label() })
            }
            NodeKind::Unary(_) => {
                self.attach_operand(operand);
                Ok(())
            }
            _ => Err(NodeError::WrongConnection { node: self.label() }),
        }
    }

    /// Reconnect a disconnected binary node
    pub fn connect_operands(self: &Rc<Self>, left: NodeRef, right: NodeRef) -> Result<(), NodeError> {
        match &self.kind {
            NodeKind::Binary(binary) if binary.operands.borrow().is_some() => {
                Err(NodeError::OperandsAlreadyConnected { node: self.label() })
            }
            NodeKind::Binary(_) => {
                self.attach_operands(left, right);
                Ok(())
            }
            _ => Err(NodeError::WrongConnection { node: self.label() }),
        }
    }

    /// Drop every subscription this node holds. Operator nodes release their
    /// children; references return to the unconnected state. Idempotent.
    pub fn disconnect(&self) {
        match &self.kind {
            NodeKind::Literal(_) => {}
            NodeKind::Reference(reference) => {
                reference.state.replace(ReferenceState::Unconnected);
            }
            NodeKind::Unary(unary) => {
                unary.operand.take();
            }
            NodeKind::Binary(binary) => {
                binary.operands.take();
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        match &self.kind {
            NodeKind::Literal(_) => true,
            NodeKind::Reference(reference) => reference.is_connected(),
            NodeKind::Unary(unary) => unary.operand.borrow().is_some(),
            NodeKind::Binary(binary) => binary.operands.borrow().is_some(),
        }
    }

    /// Pre-order walk over this node and its descendants
    pub fn traverse(self: &Rc<Self>, visitor: &mut dyn FnMut(&NodeRef)) {
        visitor(self);
        for child in self.operands() {
            child.traverse(visitor);
        }
    }

    /// Same shape, operators, names, literal values and types
    pub fn structurally_eq(&self, other: &ExpressionNode) -> bool {
        if self.data_type() != other.data_type() {
            return false;
        }
        match (&self.kind, &other.kind) {
            (NodeKind::Literal(a), NodeKind::Literal(b)) => a.same_as(b),
            (NodeKind::Reference(a), NodeKind::Reference(b)) => a.name == b.name,
            (NodeKind::Unary(a), NodeKind::Unary(b)) => {
                a.op == b.op
                    && match (a.operand_node(), b.operand_node()) {
                        (Some(x), Some(y)) => x.structurally_eq(&y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (NodeKind::Binary(a), NodeKind::Binary(b)) => {
                a.op == b.op
                    && match (a.operand_nodes(), b.operand_nodes()) {
                        (Some((l1, r1)), Some((l2, r2))) => {
                            l1.structurally_eq(&l2) && r1.structurally_eq(&r2)
                        }
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => false,
        }
    }

    fn channel(&self) -> Option<&ChangeChannel> {
        match &self.kind {
            NodeKind::Literal(_) => None,
            NodeKind::Reference(reference) => Some(&reference.channel),
            NodeKind::Unary(unary) => Some(&unary.channel),
            NodeKind::Binary(binary) => Some(&binary.channel),
        }
    }

    fn missing_operand(&self) -> NodeError {
        NodeError::MissingOperand { node: self.label() }
    }

    fn attach_operand(self: &Rc<Self>, operand: NodeRef) {
        if let NodeKind::Unary(unary) = &self.kind {
            let subscription = self.watch(&operand, Side::Operand);
            unary.operand.replace(Some(ChildLink {
                node: operand,
                _subscription: subscription,
            }));
        }
    }

    fn attach_operands(self: &Rc<Self>, left: NodeRef, right: NodeRef) {
        if let NodeKind::Binary(binary) = &self.kind {
            let left_subscription = self.watch(&left, Side::Left);
            let right_subscription = self.watch(&right, Side::Right);
            binary.operands.replace(Some((
                ChildLink {
                    node: left,
                    _subscription: left_subscription,
                },
                ChildLink {
                    node: right,
                    _subscription: right_subscription,
                },
            )));
        }
    }

    fn watch(self: &Rc<Self>, child: &NodeRef, side: Side) -> Subscription {
        let parent = Rc::downgrade(self);
        child.subscribe(move |new, old| {
            if let Some(node) = parent.upgrade() {
                node.on_operand_changed(side, new, old);
            }
        })
    }

    fn on_source_changed(&self, new: &Value, _old: &Value) {
        let NodeKind::Reference(reference) = &self.kind else {
            return;
        };
        let previous = match &mut *reference.state.borrow_mut() {
            ReferenceState::Connected { last, .. } => std::mem::replace(last, new.clone()),
            ReferenceState::Unconnected => return,
        };
        if !new.same_as(&previous) {
            reference.channel.dispatch(new, &previous);
        }
    }

    fn on_operand_changed(&self, side: Side, new: &Value, old: &Value) {
        match &self.kind {
            NodeKind::Unary(unary) => {
                emit(&unary.channel, unary.op.apply(new), unary.op.apply(old));
            }
            NodeKind::Binary(binary) => {
                let Some((left, right)) = binary.operand_nodes() else {
                    return;
                };
                let sibling = if side == Side::Left { right } else { left };
                let other = match sibling.get_value() {
                    Ok(value) => value,
                    Err(e) => {
                        log::error!("{} could not recompute after an operand change: {}", self.label(), e);
                        return;
                    }
                };
                let (new_result, old_result) = if side == Side::Left {
                    (binary.op.apply(new, &other), binary.op.apply(old, &other))
                } else {
                    (binary.op.apply(&other, new), binary.op.apply(&other, old))
                };
                emit(&binary.channel, new_result, old_result);
            }
            NodeKind::Literal(_) | NodeKind::Reference(_) => {}
        }
    }
}

fn emit(channel: &ChangeChannel, new: Value, old: Value) {
    if !new.same_as(&old) {
        channel.dispatch(&new, &old);
    }
}

/// Renders the node tree as `Add(Literal(1), Multiply(Literal(2), Literal(3)))`
impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Literal(_) | NodeKind::Reference(_) => write!(f, "{}", self.label()),
            NodeKind::Unary(unary) => match unary.operand_node() {
                Some(operand) => write!(f, "{}({})", unary.op.name(), operand),
                None => write!(f, "{}(<unconnected>)", unary.op.name()),
            },
            NodeKind::Binary(binary) => match binary.operand_nodes() {
                Some((left, right)) => write!(f, "{}({}, {})", binary.op.name(), left, right),
                None => write!(f, "{}(<unconnected>)", binary.op.name()),
            },
        }
    }
}

impl fmt::Debug for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionNode")
            .field("expr", &format_args!("{}", self))
            .field("data_type", &self.data_type())
            .field("span", &self.span)
            .finish()
    }
}
