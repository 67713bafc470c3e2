// SPDX-License-Identifier: MIT

use crate::expression::{ChangeChannel, Listener, Observable, Subscription, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct Inner {
    name: String,
    value: RefCell<Value>,
    channel: ChangeChannel,
}

/// A named value cell that notifies subscribers when it changes.
///
/// Clones share the same cell.
#[derive(Clone)]
pub struct ObservableValue {
    inner: Rc<Inner>,
}

impl ObservableValue {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            inner: Rc::new(Inner {
                name: name.into(),
                value: RefCell::new(value),
                channel: ChangeChannel::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn get(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Store a new value; subscribers are notified only if it differs.
    /// Returns whether the value changed.
    pub fn set(&self, value: Value) -> bool {
        let old = {
            let mut current = self.inner.value.borrow_mut();
            if current.same_as(&value) {
                return false;
            }
            std::mem::replace(&mut *current, value.clone())
        };
        self.inner.channel.dispatch(&value, &old);
        true
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.channel.listener_count()
    }

    /// Whether both handles point at the same cell
    pub fn ptr_eq(&self, other: &ObservableValue) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Observable for ObservableValue {
    fn get_value(&self) -> Value {
        self.get()
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.inner.channel.subscribe_boxed(listener)
    }
}

impl fmt::Debug for ObservableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableValue")
            .field("name", &self.inner.name)
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
