// SPDX-License-Identifier: MIT

//! In-memory blackboard storage

use super::observable::ObservableValue;
use super::schema::BlackboardSchema;
use super::Blackboard;
use crate::error::{BlackboardError, TriggerError};
use crate::expression::{DataType, Value};
use std::collections::BTreeMap;

#[derive(Debug)]
struct Entry {
    value: ObservableValue,
    data_type: DataType,
    refs: usize,
    /// Declared or explicitly set; survives its last release
    pinned: bool,
}

/// Reference-counted in-memory blackboard.
///
/// Declared and explicitly set names are pinned. Names created on demand by
/// `acquire` disappear again when their last reference is released.
#[derive(Debug, Default)]
pub struct MemoryBlackboard {
    entries: BTreeMap<String, Entry>,
    strict: bool,
}

impl MemoryBlackboard {
    /// Create a MemoryBlackboard from a schema
    pub fn new(schema: &BlackboardSchema) -> Result<Self, BlackboardError> {
        let mut entries = BTreeMap::new();

        for (name, def) in &schema.fields {
            let value = def.initial_value();
            if !def.data_type.accepts(value.data_type()) {
                return Err(BlackboardError::TypeMismatch {
                    name: name.clone(),
                    declared: def.data_type,
                    requested: value.data_type(),
                });
            }
            entries.insert(
                name.clone(),
                Entry {
                    value: ObservableValue::new(name.clone(), value),
                    data_type: def.data_type,
                    refs: 0,
                    pinned: true,
                },
            );
        }

        Ok(Self {
            entries,
            strict: schema.strict,
        })
    }

    /// Create an empty, non-strict MemoryBlackboard
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Write a value, notifying everything bound to it.
    ///
    /// Missing names are created (and pinned) unless the blackboard is
    /// strict. Returns whether the stored value changed.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<bool, BlackboardError> {
        let value = value.into();

        if let Some(entry) = self.entries.get_mut(name) {
            if !entry.data_type.accepts(value.data_type()) {
                return Err(BlackboardError::TypeMismatch {
                    name: name.to_string(),
                    declared: entry.data_type,
                    requested: value.data_type(),
                });
            }
            entry.pinned = true;
            return Ok(entry.value.set(value));
        }

        if self.strict {
            return Err(BlackboardError::UnknownName {
                name: name.to_string(),
            });
        }

        log::debug!("Creating blackboard entry '{}' = {}", name, value);
        self.entries.insert(
            name.to_string(),
            Entry {
                data_type: value.data_type(),
                value: ObservableValue::new(name, value),
                refs: 0,
                pinned: true,
            },
        );
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries.get(name).map(|entry| entry.value.get())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Outstanding acquisitions of `name`
    pub fn ref_count(&self, name: &str) -> usize {
        self.entries.get(name).map_or(0, |entry| entry.refs)
    }

    /// All names, sorted
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Set every leaf of a JSON object, joining nested keys with `.`
    ///
    /// `{"player": {"level": 3}}` sets `player.level` to 3.
    pub fn load_json(&mut self, json: &serde_json::Value) -> Result<(), TriggerError> {
        let serde_json::Value::Object(map) = json else {
            return Err(TriggerError::config("Blackboard values must be a JSON object"));
        };

        let mut leaves = Vec::new();
        for (key, value) in map {
            flatten(key.clone(), value, &mut leaves);
        }
        for (name, leaf) in leaves {
            let value: Value = serde_json::from_value(leaf.clone())?;
            self.set(&name, value)?;
        }
        Ok(())
    }

    /// Snapshot of all values as a flat JSON object
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let snapshot: BTreeMap<&str, Value> = self
            .entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.value.get()))
            .collect();
        serde_json::to_value(snapshot)
    }
}

fn flatten<'a>(
    prefix: String,
    value: &'a serde_json::Value,
    out: &mut Vec<(String, &'a serde_json::Value)>,
) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                flatten(format!("{}.{}", prefix, key), child, out);
            }
        }
        leaf => out.push((prefix, leaf)),
    }
}

impl Blackboard for MemoryBlackboard {
    fn acquire(
        &mut self,
        name: &str,
        data_type: DataType,
    ) -> Result<ObservableValue, BlackboardError> {
        if let Some(entry) = self.entries.get_mut(name) {
            if !entry.data_type.accepts(data_type) {
                return Err(BlackboardError::TypeMismatch {
                    name: name.to_string(),
                    declared: entry.data_type,
                    requested: data_type,
                });
            }
            if !entry.data_type.is_concrete() {
                entry.data_type = data_type;
            }
            entry.refs += 1;
            log::debug!("Acquired '{}' ({} refs)", name, entry.refs);
            return Ok(entry.value.clone());
        }

        if self.strict {
            return Err(BlackboardError::UnknownName {
                name: name.to_string(),
            });
        }

        let value = ObservableValue::new(name, data_type.zero_value());
        self.entries.insert(
            name.to_string(),
            Entry {
                value: value.clone(),
                data_type,
                refs: 1,
                pinned: false,
            },
        );
        log::debug!("Created '{}' as {} on acquire", name, data_type);
        Ok(value)
    }

    fn release(&mut self, name: &str) {
        let remove = match self.entries.get_mut(name) {
            None => {
                log::warn!("Release of unknown blackboard name '{}'", name);
                false
            }
            Some(entry) if entry.refs == 0 => {
                log::warn!("Unbalanced release of blackboard name '{}'", name);
                false
            }
            Some(entry) => {
                entry.refs -= 1;
                entry.refs == 0 && !entry.pinned
            }
        };
        if remove {
            log::debug!("Removing '{}' after its last release", name);
            self.entries.remove(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::FieldDef;
    use crate::expression::Observable;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_schema() -> BlackboardSchema {
        BlackboardSchema::default()
            .field("gold", FieldDef::new(DataType::Number).with_default(10.0))
            .field("quest.done", FieldDef::new(DataType::Boolean))
    }

    #[test]
    fn test_empty_blackboard() {
        let bb = MemoryBlackboard::empty();
        assert!(bb.names().is_empty());
        assert!(!bb.is_strict());
    }

    #[test]
    fn test_declared_fields_get_defaults() {
        let bb = MemoryBlackboard::new(&make_schema()).unwrap();
        assert_eq!(bb.get("gold"), Some(Value::Number(10.0)));
        assert_eq!(bb.get("quest.done"), Some(Value::Boolean(false)));
        assert_eq!(bb.names(), vec!["gold", "quest.done"]);
    }

    #[test]
    fn test_default_must_match_declared_type() {
        let schema = BlackboardSchema::default()
            .field("gold", FieldDef::new(DataType::Number).with_default("lots"));
        let err = MemoryBlackboard::new(&schema).unwrap_err();
        assert!(matches!(err, BlackboardError::TypeMismatch { .. }));
    }

    #[test]
    fn test_acquire_creates_zero_value_on_demand() {
        let mut bb = MemoryBlackboard::empty();
        let value = bb.acquire("hp", DataType::Number).unwrap();
        assert_eq!(value.get(), Value::Number(0.0));
        assert_eq!(bb.ref_count("hp"), 1);

        bb.release("hp");
        assert!(!bb.contains("hp"));
    }

    #[test]
    fn test_acquire_shares_one_value() {
        let mut bb = MemoryBlackboard::empty();
        let a = bb.acquire("hp", DataType::Number).unwrap();
        let b = bb.acquire("hp", DataType::Any).unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(bb.ref_count("hp"), 2);

        bb.release("hp");
        assert!(bb.contains("hp"));
        bb.release("hp");
        assert!(!bb.contains("hp"));
    }

    #[test]
    fn test_pinned_entries_survive_release() {
        let mut bb = MemoryBlackboard::new(&make_schema()).unwrap();
        bb.acquire("gold", DataType::Number).unwrap();
        bb.release("gold");
        assert!(bb.contains("gold"));
        assert_eq!(bb.ref_count("gold"), 0);
    }

    #[test]
    fn test_strict_rejects_unknown_names() {
        let mut bb = MemoryBlackboard::new(&make_schema().strict(true)).unwrap();
        assert_eq!(
            bb.acquire("mana", DataType::Number).unwrap_err(),
            BlackboardError::UnknownName {
                name: "mana".to_string()
            }
        );
        assert!(bb.set("mana", 1.0).is_err());
        assert!(bb.acquire("gold", DataType::Number).is_ok());
    }

    #[test]
    fn test_acquire_type_mismatch() {
        let mut bb = MemoryBlackboard::new(&make_schema()).unwrap();
        let err = bb.acquire("gold", DataType::Boolean).unwrap_err();
        assert_eq!(
            err,
            BlackboardError::TypeMismatch {
                name: "gold".to_string(),
                declared: DataType::Number,
                requested: DataType::Boolean,
            }
        );
        assert_eq!(bb.ref_count("gold"), 0);
    }

    #[test]
    fn test_set_notifies_acquired_value() {
        let mut bb = MemoryBlackboard::new(&make_schema()).unwrap();
        let gold = bb.acquire("gold", DataType::Number).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = gold.subscribe(Box::new(move |new, _| sink.borrow_mut().push(new.clone())));

        assert!(bb.set("gold", 25.0).unwrap());
        assert!(!bb.set("gold", 25.0).unwrap());
        assert_eq!(*seen.borrow(), vec![Value::Number(25.0)]);
    }

    #[test]
    fn test_set_checks_type_and_creates() {
        let mut bb = MemoryBlackboard::new(&make_schema()).unwrap();
        assert!(bb.set("gold", true).is_err());
        assert!(bb.set("npc.name", "Ada").unwrap());
        assert_eq!(bb.get("npc.name"), Some(Value::String("Ada".to_string())));
    }

    #[test]
    fn test_release_unknown_name_is_harmless() {
        let mut bb = MemoryBlackboard::empty();
        bb.release("nothing");
        assert!(bb.names().is_empty());
    }

    #[test]
    fn test_load_json_flattens() {
        let mut bb = MemoryBlackboard::empty();
        bb.load_json(&json!({
            "player": { "level": 4, "name": "Ada" },
            "flags": [true, false],
            "done": true
        }))
        .unwrap();

        assert_eq!(bb.get("player.level"), Some(Value::Number(4.0)));
        assert_eq!(bb.get("player.name"), Some(Value::String("Ada".to_string())));
        assert_eq!(bb.get("done"), Some(Value::Boolean(true)));
        assert_eq!(
            bb.get("flags"),
            Some(Value::Array(vec![Value::Boolean(true), Value::Boolean(false)]))
        );
        assert!(bb.load_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_to_json() {
        let bb = MemoryBlackboard::new(&make_schema()).unwrap();
        assert_eq!(
            bb.to_json().unwrap(),
            json!({ "gold": 10.0, "quest.done": false })
        );
    }
}
