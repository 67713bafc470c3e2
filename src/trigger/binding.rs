// SPDX-License-Identifier: MIT

//! A single trigger bound to a blackboard
//!
//! Lifecycle: `Trigger::new(code)` → `compile()` → `link(bb)` → `unlink(bb)`.
//! `link` and `unlink` are both idempotent; every name acquired by `link` is
//! released exactly once by `unlink`.

use crate::blackboard::Blackboard;
use crate::error::TriggerError;
use crate::expression::{
    compile_reactive_expression, infer, DataType, NodeRef, Observable, Subscription, TypeWarning,
    Value,
};
use std::fmt;
use std::rc::Rc;

/// Every reference node that reads the same blackboard name
#[derive(Debug, Clone)]
pub struct ReferenceGroup {
    pub name: String,
    /// First concrete type inferred for the name, or Any
    pub data_type: DataType,
    nodes: Vec<NodeRef>,
}

impl ReferenceGroup {
    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }
}

struct Compiled {
    code: String,
    root: NodeRef,
    references: Vec<ReferenceGroup>,
    warnings: Vec<TypeWarning>,
}

/// A compiled trigger expression and its blackboard binding
pub struct Trigger {
    code: String,
    compiled: Option<Compiled>,
    linked: bool,
}

impl Trigger {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            compiled: None,
            linked: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replace the source. While linked the old graph stays live; the new
    /// code is compiled after the next `unlink`.
    pub fn set_code(&mut self, code: impl Into<String>) {
        let code = code.into();
        if self.linked && code != self.code {
            log::warn!(
                "Trigger code changed to '{}' while linked; unlink before recompiling",
                code
            );
        }
        self.code = code;
    }

    /// Parse, compile, infer types and collect references.
    ///
    /// Does nothing when the current code is already compiled.
    pub fn compile(&mut self) -> Result<(), TriggerError> {
        if self.is_compiled() {
            return Ok(());
        }
        if self.linked {
            log::error!("Refusing to recompile '{}' while linked", self.code);
            return Err(TriggerError::CompileWhileLinked {
                code: self.code.clone(),
            });
        }

        self.compiled = None;
        let root = compile_reactive_expression(&self.code)?;
        let mut warnings = infer(&root);
        let references = collect_references(&root, &mut warnings);
        log::debug!(
            "Compiled '{}' as {} ({} names, {} warnings)",
            self.code,
            root,
            references.len(),
            warnings.len()
        );

        self.compiled = Some(Compiled {
            code: self.code.clone(),
            root,
            references,
            warnings,
        });
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
            .as_ref()
            .is_some_and(|compiled| compiled.code == self.code)
    }

    /// Acquire every referenced name and connect the graph to it.
    ///
    /// On failure everything acquired so far is released again and the
    /// trigger stays unlinked.
    pub fn link(&mut self, blackboard: &mut dyn Blackboard) -> Result<(), TriggerError> {
        if self.linked {
            log::debug!("'{}' is already linked", self.code);
            return Ok(());
        }
        self.compile()?;
        let compiled = self.compiled()?;

        for (index, group) in compiled.references.iter().enumerate() {
            if let Err(e) = bind(group, blackboard) {
                for bound in &compiled.references[..index] {
                    unbind(bound, blackboard);
                }
                log::debug!("Rolled back link of '{}': {}", self.code, e);
                return Err(e);
            }
        }

        self.linked = true;
        log::debug!("Linked '{}'", self.code);
        Ok(())
    }

    /// Disconnect the graph and release every acquired name
    pub fn unlink(&mut self, blackboard: &mut dyn Blackboard) {
        if !self.linked {
            return;
        }
        if let Some(compiled) = &self.compiled {
            for group in &compiled.references {
                unbind(group, blackboard);
            }
        }
        self.linked = false;
        log::debug!("Unlinked '{}'", self.code);
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Root of the compiled graph
    pub fn expression(&self) -> Option<&NodeRef> {
        self.compiled.as_ref().map(|compiled| &compiled.root)
    }

    /// Current value of the root node
    pub fn evaluate(&self) -> Result<Value, TriggerError> {
        Ok(self.compiled()?.root.get_value()?)
    }

    /// Whether the trigger currently fires. Anything that keeps the root
    /// from evaluating counts as inactive.
    pub fn is_active(&self) -> bool {
        if !self.linked {
            return false;
        }
        match self.evaluate() {
            Ok(value) => value.is_truthy(),
            Err(e) => {
                log::warn!("'{}' could not be evaluated: {}", self.code, e);
                false
            }
        }
    }

    /// Watch the root value. The subscription survives unlink and relink of
    /// the same compiled code.
    pub fn subscribe<F>(&self, listener: F) -> Result<Subscription, TriggerError>
    where
        F: Fn(&Value, &Value) + 'static,
    {
        Ok(self.compiled()?.root.subscribe(listener))
    }

    pub fn warnings(&self) -> &[TypeWarning] {
        self.compiled
            .as_ref()
            .map(|compiled| compiled.warnings.as_slice())
            .unwrap_or_default()
    }

    /// Referenced blackboard names in first-occurrence order
    pub fn references(&self) -> Vec<&str> {
        self.reference_groups()
            .iter()
            .map(|group| group.name.as_str())
            .collect()
    }

    pub fn reference_groups(&self) -> &[ReferenceGroup] {
        self.compiled
            .as_ref()
            .map(|compiled| compiled.references.as_slice())
            .unwrap_or_default()
    }

    fn compiled(&self) -> Result<&Compiled, TriggerError> {
        self.compiled.as_ref().ok_or_else(|| TriggerError::NotCompiled {
            code: self.code.clone(),
        })
    }
}

impl Drop for Trigger {
    fn drop(&mut self) {
        if self.linked {
            log::warn!(
                "Trigger '{}' dropped while linked; its blackboard names were not released",
                self.code
            );
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("code", &self.code)
            .field("compiled", &self.is_compiled())
            .field("linked", &self.linked)
            .finish()
    }
}

fn collect_references(root: &NodeRef, warnings: &mut Vec<TypeWarning>) -> Vec<ReferenceGroup> {
    let mut groups: Vec<ReferenceGroup> = Vec::new();

    root.traverse(&mut |node| {
        let Some(name) = node.reference_name() else {
            return;
        };
        let found = node.data_type();
        let group = match groups.iter().position(|group| group.name == name) {
            Some(index) => &mut groups[index],
            None => {
                groups.push(ReferenceGroup {
                    name: name.to_string(),
                    data_type: DataType::Any,
                    nodes: Vec::new(),
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };

        if !group.data_type.is_concrete() {
            group.data_type = found;
        } else if found.is_concrete() && found != group.data_type {
            let warning = TypeWarning {
                span: node.span(),
                node: node.label(),
                expected: group.data_type,
                found,
            };
            log::warn!("Conflicting uses of '{}': {}", name, warning);
            warnings.push(warning);
        }
        group.nodes.push(Rc::clone(node));
    });

    groups
}

fn bind(group: &ReferenceGroup, blackboard: &mut dyn Blackboard) -> Result<(), TriggerError> {
    let value = blackboard.acquire(&group.name, group.data_type)?;
    let source: Rc<dyn Observable> = Rc::new(value);
    for node in &group.nodes {
        if let Err(e) = node.connect_source(Rc::clone(&source)) {
            unbind(group, blackboard);
            return Err(e.into());
        }
    }
    Ok(())
}

fn unbind(group: &ReferenceGroup, blackboard: &mut dyn Blackboard) {
    for node in &group.nodes {
        node.disconnect();
    }
    blackboard.release(&group.name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::{BlackboardSchema, FieldDef, MemoryBlackboard, ObservableValue};
    use crate::error::BlackboardError;
    use std::cell::RefCell;

    /// Delegates to a MemoryBlackboard and records every call
    #[derive(Default)]
    struct CountingBlackboard {
        inner: MemoryBlackboard,
        acquired: Vec<(String, DataType)>,
        released: Vec<String>,
    }

    impl Blackboard for CountingBlackboard {
        fn acquire(
            &mut self,
            name: &str,
            data_type: DataType,
        ) -> Result<ObservableValue, BlackboardError> {
            self.acquired.push((name.to_string(), data_type));
            self.inner.acquire(name, data_type)
        }

        fn release(&mut self, name: &str) {
            self.released.push(name.to_string());
            self.inner.release(name);
        }
    }

    #[test]
    fn test_link_is_idempotent() {
        let mut bb = CountingBlackboard::default();
        let mut trigger = Trigger::new("a && b");

        trigger.link(&mut bb).unwrap();
        trigger.link(&mut bb).unwrap();
        assert_eq!(
            bb.acquired,
            vec![
                ("a".to_string(), DataType::Boolean),
                ("b".to_string(), DataType::Boolean)
            ]
        );

        trigger.unlink(&mut bb);
        trigger.unlink(&mut bb);
        assert_eq!(bb.released, vec!["a", "b"]);
    }

    #[test]
    fn test_unlink_before_link_is_noop() {
        let mut bb = CountingBlackboard::default();
        let mut trigger = Trigger::new("done");
        trigger.unlink(&mut bb);
        assert!(bb.released.is_empty());
        assert!(!trigger.is_linked());
    }

    #[test]
    fn test_same_name_is_acquired_once() {
        let mut bb = CountingBlackboard::default();
        bb.inner.set("x", 5.0).unwrap();
        let mut trigger = Trigger::new("x - - x");

        trigger.link(&mut bb).unwrap();
        assert_eq!(bb.acquired.len(), 1);
        assert_eq!(bb.inner.ref_count("x"), 1);
        assert_eq!(trigger.reference_groups()[0].nodes().len(), 2);
        assert_eq!(trigger.evaluate().unwrap(), Value::Number(10.0));

        bb.inner.set("x", 6.0).unwrap();
        assert_eq!(trigger.evaluate().unwrap(), Value::Number(12.0));
        trigger.unlink(&mut bb);
    }

    #[test]
    fn test_values_propagate_after_link() {
        let mut bb = MemoryBlackboard::empty();
        let mut trigger = Trigger::new("player.level >= 5 && quest.accepted");
        trigger.link(&mut bb).unwrap();
        assert!(!trigger.is_active());

        bb.set("player.level", 7.0).unwrap();
        assert!(!trigger.is_active());
        bb.set("quest.accepted", true).unwrap();
        assert!(trigger.is_active());

        trigger.unlink(&mut bb);
        assert!(!trigger.is_active());
    }

    #[test]
    fn test_compile_is_idempotent() {
        let mut trigger = Trigger::new("a > 1");
        trigger.compile().unwrap();
        let first = Rc::clone(trigger.expression().unwrap());
        trigger.compile().unwrap();
        assert!(Rc::ptr_eq(&first, trigger.expression().unwrap()));
    }

    #[test]
    fn test_recompile_while_linked_is_refused() {
        let mut bb = MemoryBlackboard::empty();
        let mut trigger = Trigger::new("a");
        trigger.link(&mut bb).unwrap();

        trigger.set_code("b");
        assert!(!trigger.is_compiled());
        assert!(matches!(
            trigger.compile(),
            Err(TriggerError::CompileWhileLinked { .. })
        ));
        // the old graph keeps running
        bb.set("a", true).unwrap();
        assert!(trigger.is_active());

        trigger.unlink(&mut bb);
        trigger.link(&mut bb).unwrap();
        assert_eq!(trigger.references(), vec!["b"]);
        trigger.unlink(&mut bb);
    }

    #[test]
    fn test_failed_link_rolls_back() {
        let schema = BlackboardSchema::default()
            .strict(true)
            .field("a", FieldDef::new(DataType::Boolean));
        let mut bb = MemoryBlackboard::new(&schema).unwrap();
        let mut trigger = Trigger::new("a && missing");

        let err = trigger.link(&mut bb).unwrap_err();
        assert!(matches!(
            err,
            TriggerError::Binding(BlackboardError::UnknownName { .. })
        ));
        assert!(!trigger.is_linked());
        assert_eq!(bb.ref_count("a"), 0);
        assert!(trigger
            .reference_groups()
            .iter()
            .flat_map(|group| group.nodes())
            .all(|node| !node.is_connected()));
    }

    #[test]
    fn test_syntax_error_fails_closed() {
        let mut bb = MemoryBlackboard::empty();
        let mut trigger = Trigger::new("a &&");
        assert!(matches!(
            trigger.link(&mut bb),
            Err(TriggerError::Syntax(_))
        ));
        assert!(!trigger.is_compiled());
        assert!(!trigger.is_active());
        assert!(matches!(
            trigger.evaluate(),
            Err(TriggerError::NotCompiled { .. })
        ));
    }

    #[test]
    fn test_conflicting_reference_types_warn() {
        let mut bb = CountingBlackboard::default();
        let mut trigger = Trigger::new("x > 1 && x");
        trigger.link(&mut bb).unwrap();
        assert_eq!(bb.acquired, vec![("x".to_string(), DataType::Number)]);
        assert_eq!(trigger.warnings().len(), 1);
        assert_eq!(trigger.warnings()[0].found, DataType::Boolean);
        trigger.unlink(&mut bb);
    }

    #[test]
    fn test_bare_reference_requests_boolean() {
        let mut bb = CountingBlackboard::default();
        let mut trigger = Trigger::new("done");
        trigger.link(&mut bb).unwrap();
        assert_eq!(trigger.expression().unwrap().data_type(), DataType::Boolean);
        assert_eq!(bb.acquired, vec![("done".to_string(), DataType::Boolean)]);
        trigger.unlink(&mut bb);
    }

    #[test]
    fn test_subscription_survives_relink() {
        let mut bb = MemoryBlackboard::empty();
        let mut trigger = Trigger::new("hp < 10");
        trigger.compile().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = trigger
            .subscribe(move |new, _| sink.borrow_mut().push(new.clone()))
            .unwrap();

        bb.set("hp", 50.0).unwrap();
        trigger.link(&mut bb).unwrap();
        bb.set("hp", 5.0).unwrap();
        trigger.unlink(&mut bb);
        bb.set("hp", 50.0).unwrap();
        trigger.link(&mut bb).unwrap();
        bb.set("hp", 1.0).unwrap();
        trigger.unlink(&mut bb);

        assert_eq!(
            *seen.borrow(),
            vec![Value::Boolean(true), Value::Boolean(true)]
        );
    }
}
