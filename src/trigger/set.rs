// SPDX-License-Identifier: MIT

//! Named triggers linked and watched together

use super::binding::Trigger;
use super::types::TriggerDefinition;
use crate::blackboard::Blackboard;
use crate::error::TriggerError;
use crate::expression::Subscription;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A trigger switching on or off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub active: bool,
}

#[derive(Debug)]
struct Entry {
    id: String,
    description: Option<String>,
    trigger: Trigger,
    watch: Option<Subscription>,
    /// Activity last reported through a transition
    seen: Rc<Cell<bool>>,
}

impl Entry {
    /// Record a transition if the trigger's activity moved without the
    /// root reporting it, as across unlink and relink
    fn sync(&self, transitions: &RefCell<Vec<Transition>>) {
        let active = self.trigger.is_active();
        if active != self.seen.replace(active) {
            log::debug!("Trigger '{}' is now {}", self.id, describe(active));
            transitions.borrow_mut().push(Transition {
                id: self.id.clone(),
                active,
            });
        }
    }
}

/// Triggers in insertion order, keyed by unique id.
///
/// A trigger that fails to compile or bind is logged and skipped; the rest
/// keep running.
#[derive(Debug, Default)]
pub struct TriggerSet {
    entries: Vec<Entry>,
    transitions: Rc<RefCell<Vec<Transition>>>,
}

impl TriggerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(definitions: &[TriggerDefinition]) -> Result<Self, TriggerError> {
        let mut set = Self::new();
        for def in definitions {
            set.add(def.id.clone(), def.when.clone())?;
            if let Some(entry) = set.entries.last_mut() {
                entry.description = def.description.clone();
            }
        }
        Ok(set)
    }

    pub fn add(&mut self, id: impl Into<String>, code: impl Into<String>) -> Result<(), TriggerError> {
        let id = id.into();
        if self.entries.iter().any(|entry| entry.id == id) {
            return Err(TriggerError::duplicate(id));
        }
        self.entries.push(Entry {
            id,
            description: None,
            trigger: Trigger::new(code),
            watch: None,
            seen: Rc::new(Cell::new(false)),
        });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Trigger> {
        self.entry(id).map(|entry| &entry.trigger)
    }

    pub fn description(&self, id: &str) -> Option<&str> {
        self.entry(id).and_then(|entry| entry.description.as_deref())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Link every trigger, returning the ones that failed.
    ///
    /// A trigger that is already firing once linked records a transition.
    pub fn link_all(&mut self, blackboard: &mut dyn Blackboard) -> Vec<(String, TriggerError)> {
        let mut failures = Vec::new();

        for entry in &mut self.entries {
            if let Err(e) = entry.trigger.link(blackboard) {
                log::error!("Trigger '{}' failed to link: {}", entry.id, e);
                failures.push((entry.id.clone(), e));
                continue;
            }
            if entry.watch.is_none() {
                entry.watch = watch(entry, &self.transitions);
            }
            entry.sync(&self.transitions);
        }

        log::debug!(
            "Linked {} of {} triggers",
            self.entries.len() - failures.len(),
            self.entries.len()
        );
        failures
    }

    pub fn unlink_all(&mut self, blackboard: &mut dyn Blackboard) {
        for entry in &mut self.entries {
            entry.trigger.unlink(blackboard);
            entry.sync(&self.transitions);
        }
    }

    /// Ids of triggers currently firing, in insertion order
    pub fn active_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.trigger.is_active())
            .map(|entry| entry.id.as_str())
            .collect()
    }

    /// Transitions recorded since the last poll, oldest first
    pub fn poll_transitions(&self) -> Vec<Transition> {
        std::mem::take(&mut *self.transitions.borrow_mut())
    }

    fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}

fn describe(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "inactive"
    }
}

fn watch(entry: &Entry, transitions: &Rc<RefCell<Vec<Transition>>>) -> Option<Subscription> {
    let id = entry.id.clone();
    let seen = Rc::clone(&entry.seen);
    let sink = Rc::clone(transitions);
    let subscription = entry.trigger.subscribe(move |new, _| {
        let active = new.is_truthy();
        if active != seen.replace(active) {
            log::debug!("Trigger '{}' is now {}", id, describe(active));
            sink.borrow_mut().push(Transition {
                id: id.clone(),
                active,
            });
        }
    });
    match subscription {
        Ok(subscription) => Some(subscription),
        Err(e) => {
            log::error!("Cannot watch trigger: {}", e);
            None
        }
    }
}
