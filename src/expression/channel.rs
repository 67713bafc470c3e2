// SPDX-License-Identifier: MIT

//! Change notification primitives
//!
//! - [`ChangeChannel`]: a list of `(new, old)` listeners, notified in
//!   registration order.
//! - [`Subscription`]: RAII guard; dropping it removes the listener.
//! - [`Observable`]: the seam through which externally owned values feed
//!   reference nodes.
//!
//! Everything is single-threaded (`Rc`/`RefCell`). The listener list is
//! snapshotted before dispatch, so a listener may drop subscriptions
//! (including its own) while being notified.

use super::types::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Callback receiving `(new_value, old_value)`
pub type Listener = Box<dyn Fn(&Value, &Value)>;

/// A live value that can be read and watched
pub trait Observable {
    /// Current value
    fn get_value(&self) -> Value;

    /// Register a listener fired with `(new, old)` whenever the value changes
    fn subscribe(&self, listener: Listener) -> Subscription;
}

#[derive(Default)]
struct ChannelInner {
    next_id: u64,
    listeners: Vec<(u64, Rc<dyn Fn(&Value, &Value)>)>,
}

#[derive(Clone, Default)]
pub struct ChangeChannel {
    inner: Rc<RefCell<ChannelInner>>,
}

impl ChangeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Value, &Value) + 'static,
    {
        self.subscribe_boxed(Box::new(listener))
    }

    pub fn subscribe_boxed(&self, listener: Listener) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Rc::from(listener)));
        Subscription {
            channel: Some(Rc::downgrade(&self.inner)),
            id,
        }
    }

    /// Notify every listener registered at the time of the call
    pub fn dispatch(&self, new: &Value, old: &Value) {
        let snapshot: Vec<Rc<dyn Fn(&Value, &Value)>> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(new, old);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl fmt::Debug for ChangeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeChannel")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle to a registered listener; dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    channel: Option<Weak<RefCell<ChannelInner>>>,
    id: u64,
}

impl Subscription {
    /// A subscription attached to nothing, used for values that never change
    pub fn inert() -> Self {
        Self {
            channel: None,
            id: 0,
        }
    }

    /// Whether the listener is still registered on a live channel
    pub fn is_active(&self) -> bool {
        let Some(inner) = self.channel.as_ref().and_then(Weak::upgrade) else {
            return false;
        };
        let registered = inner.borrow().listeners.iter().any(|(id, _)| *id == self.id);
        registered
    }

    /// Unsubscribe now
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.channel.take().and_then(|weak| weak.upgrade()) {
            inner
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
