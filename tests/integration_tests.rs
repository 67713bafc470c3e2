//! Integration tests for trigger compilation, binding and propagation
//!
//! These tests drive the public API end to end, using a recording
//! blackboard where acquire/release pairing matters.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use trigger_rs::blackboard::{Blackboard, BlackboardSchema, FieldDef, MemoryBlackboard, ObservableValue};
use trigger_rs::error::{BlackboardError, NodeError, TriggerError};
use trigger_rs::expression::{
    compile_reactive_expression, infer, DataType, ExpressionNode, NodeRef, Observable, Span,
    Value,
};
use trigger_rs::trigger::{Transition, Trigger, TriggerLoader, TriggerSet};

// ============================================================================
// Mock Components
// ============================================================================

/// Blackboard that hands out one value per name and records every call
#[derive(Default)]
struct RecordingBlackboard {
    values: Vec<ObservableValue>,
    acquires: Vec<String>,
    releases: Vec<String>,
    refuse: Option<String>,
}

impl RecordingBlackboard {
    fn refusing(name: &str) -> Self {
        Self {
            refuse: Some(name.to_string()),
            ..Self::default()
        }
    }

    fn value(&self, name: &str) -> Option<&ObservableValue> {
        self.values.iter().find(|v| v.name() == name)
    }
}

impl Blackboard for RecordingBlackboard {
    fn acquire(
        &mut self,
        name: &str,
        data_type: DataType,
    ) -> Result<ObservableValue, BlackboardError> {
        if self.refuse.as_deref() == Some(name) {
            return Err(BlackboardError::UnknownName {
                name: name.to_string(),
            });
        }
        self.acquires.push(name.to_string());
        if let Some(existing) = self.value(name) {
            return Ok(existing.clone());
        }
        let value = ObservableValue::new(name, data_type.zero_value());
        self.values.push(value.clone());
        Ok(value)
    }

    fn release(&mut self, name: &str) {
        self.releases.push(name.to_string());
    }
}

fn connect_all(root: &NodeRef, source: &ObservableValue) {
    root.traverse(&mut |node| {
        if node.reference_name().is_some() {
            node.connect_source(Rc::new(source.clone())).unwrap();
        }
    });
}

// ============================================================================
// Compilation Tests
// ============================================================================

#[test]
fn test_precedence_compiles_and_evaluates() {
    let root = compile_reactive_expression("1 + 2 * 3").unwrap();
    assert_eq!(
        root.to_string(),
        "Add(Literal(1), Multiply(Literal(2), Literal(3)))"
    );
    assert_eq!(root.get_value(), Ok(Value::Number(7.0)));
}

#[test]
fn test_double_negative_subtraction() {
    let root = compile_reactive_expression("x - - x").unwrap();
    assert_eq!(
        root.to_string(),
        "Subtract(Reference(x), Negate(Reference(x)))"
    );
    let x = ObservableValue::new("x", Value::Number(5.0));
    connect_all(&root, &x);
    assert_eq!(root.get_value(), Ok(Value::Number(10.0)));
}

#[test]
fn test_double_not_is_identity_for_booleans() {
    let root = compile_reactive_expression("!!x").unwrap();
    assert_eq!(root.to_string(), "Not(Not(Reference(x)))");
    let x = ObservableValue::new("x", Value::Boolean(true));
    connect_all(&root, &x);
    assert_eq!(root.get_value(), Ok(Value::Boolean(true)));
    x.set(Value::Boolean(false));
    assert_eq!(root.get_value(), Ok(Value::Boolean(false)));
}

#[test]
fn test_group_is_exactly_its_content() {
    let grouped = compile_reactive_expression("(x)").unwrap();
    let plain = ExpressionNode::reference("x", Span::new(1, 2));
    assert!(grouped.structurally_eq(&plain));
    assert_eq!(grouped.to_string(), "Reference(x)");
}

#[test]
fn test_same_source_compiles_to_independent_graphs() {
    let first = compile_reactive_expression("a > 1 && b").unwrap();
    let second = compile_reactive_expression("a > 1 && b").unwrap();
    assert!(first.structurally_eq(&second));

    let a = ObservableValue::new("a", Value::Number(5.0));
    connect_all(&first, &a);
    assert_eq!(first.get_value(), Ok(Value::Boolean(true)));
    assert!(matches!(
        second.get_value(),
        Err(NodeError::NotConnected { .. })
    ));
}

#[test]
fn test_bare_reference_root_is_boolean() {
    let root = compile_reactive_expression("done").unwrap();
    assert_eq!(root.data_type(), DataType::Any);
    assert!(infer(&root).is_empty());
    assert_eq!(root.data_type(), DataType::Boolean);
}

#[test]
fn test_syntax_error_reports_position_and_expected() {
    let err = compile_reactive_expression("player.level >= ").unwrap_err();
    assert_eq!(err.offset, 16);
    assert_eq!((err.line, err.column), (1, 17));
    assert_eq!(err.found, "end of input");
    assert!(err.expected.contains(&"identifier".to_string()));
    assert!(err.expected.contains(&"number".to_string()));
}

#[test]
fn test_type_conflict_warns_but_compiles() {
    let mut trigger = Trigger::new("!(hp + 1)");
    trigger.compile().unwrap();
    assert!(trigger.is_compiled());
    assert_eq!(trigger.warnings().len(), 1);
}

#[test]
fn test_division_follows_ieee() {
    let root = compile_reactive_expression("1 / 0").unwrap();
    assert_eq!(root.get_value(), Ok(Value::Number(f64::INFINITY)));
    let root = compile_reactive_expression("0 / 0 == 0 / 0").unwrap();
    assert_eq!(root.get_value(), Ok(Value::Boolean(false)));
}

#[test]
fn test_deeply_nested_trigger_fails_to_compile() {
    let code = format!("{}ready{}", "(".repeat(1000), ")".repeat(1000));
    let mut trigger = Trigger::new(code);
    assert!(matches!(trigger.compile(), Err(TriggerError::Syntax(_))));

    let mut bb = RecordingBlackboard::default();
    assert!(trigger.link(&mut bb).is_err());
    assert!(!trigger.is_active());
    assert!(bb.acquires.is_empty());

    let negations = format!("{}x", "!".repeat(200_000));
    assert!(compile_reactive_expression(&negations).is_err());
    let long_chain = vec!["x"; 100_000].join(" && ");
    assert!(compile_reactive_expression(&long_chain).is_err());
}

// ============================================================================
// Propagation Tests
// ============================================================================

#[test]
fn test_reference_fires_once_per_real_change() {
    let root = compile_reactive_expression("x").unwrap();
    let x = ObservableValue::new("x", Value::Number(1.0));
    connect_all(&root, &x);

    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let _sub = root.subscribe(move |_, _| counter.set(counter.get() + 1));

    x.set(Value::Number(1.0));
    x.set(Value::Number(1.0));
    x.set(Value::Number(2.0));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_root_reports_new_and_old() {
    let root = compile_reactive_expression("gold * 2 > 10").unwrap();
    let gold = ObservableValue::new("gold", Value::Number(0.0));
    connect_all(&root, &gold);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _sub = root.subscribe(move |new, old| sink.borrow_mut().push((new.clone(), old.clone())));

    gold.set(Value::Number(3.0));
    gold.set(Value::Number(6.0));
    gold.set(Value::Number(7.0));
    assert_eq!(
        *seen.borrow(),
        vec![(Value::Boolean(true), Value::Boolean(false))]
    );
}

#[test]
fn test_disconnect_stops_propagation() {
    let root = compile_reactive_expression("flag").unwrap();
    let flag = ObservableValue::new("flag", Value::Boolean(false));
    connect_all(&root, &flag);
    assert_eq!(flag.subscriber_count(), 1);

    root.disconnect();
    root.disconnect();
    assert_eq!(flag.subscriber_count(), 0);
    assert!(!root.is_connected());
}

// ============================================================================
// Binding Tests
// ============================================================================

#[test]
fn test_link_twice_acquires_each_name_once() {
    let mut bb = RecordingBlackboard::default();
    let mut trigger = Trigger::new("a && b || a");

    trigger.link(&mut bb).unwrap();
    trigger.link(&mut bb).unwrap();
    assert_eq!(bb.acquires, vec!["a", "b"]);

    trigger.unlink(&mut bb);
    assert_eq!(bb.releases, vec!["a", "b"]);
}

#[test]
fn test_unlink_before_link_is_noop() {
    let mut bb = RecordingBlackboard::default();
    let mut trigger = Trigger::new("a");
    trigger.unlink(&mut bb);
    assert!(bb.releases.is_empty());
}

#[test]
fn test_failed_link_releases_what_it_acquired() {
    let mut bb = RecordingBlackboard::refusing("c");
    let mut trigger = Trigger::new("a && b && c");

    let err = trigger.link(&mut bb).unwrap_err();
    assert!(matches!(err, TriggerError::Binding(_)));
    assert!(!trigger.is_linked());
    assert_eq!(bb.acquires, vec!["a", "b"]);
    assert_eq!(bb.releases, vec!["a", "b"]);
    assert_eq!(bb.value("a").unwrap().subscriber_count(), 0);
}

#[test]
fn test_trigger_follows_blackboard_updates() {
    let schema = BlackboardSchema::default()
        .field("player.level", FieldDef::new(DataType::Number).with_default(1.0))
        .field("quest.accepted", FieldDef::new(DataType::Boolean));
    let mut bb = MemoryBlackboard::new(&schema).unwrap();
    let mut trigger = Trigger::new("quest.accepted && player.level >= 5");
    trigger.link(&mut bb).unwrap();

    let fired = Rc::new(Cell::new(0));
    let counter = Rc::clone(&fired);
    let _sub = trigger
        .subscribe(move |new, _| {
            if new.is_truthy() {
                counter.set(counter.get() + 1);
            }
        })
        .unwrap();

    bb.set("quest.accepted", true).unwrap();
    bb.set("player.level", 4.0).unwrap();
    assert!(!trigger.is_active());
    bb.set("player.level", 5.0).unwrap();
    assert!(trigger.is_active());
    assert_eq!(fired.get(), 1);

    trigger.unlink(&mut bb);
    assert_eq!(bb.ref_count("player.level"), 0);
}

#[test]
fn test_type_mismatch_is_reported_as_binding_error() {
    let schema = BlackboardSchema::default().field("gold", FieldDef::new(DataType::Number));
    let mut bb = MemoryBlackboard::new(&schema).unwrap();
    let mut trigger = Trigger::new("gold && rich");

    let err = trigger.link(&mut bb).unwrap_err();
    assert!(matches!(
        err,
        TriggerError::Binding(BlackboardError::TypeMismatch { .. })
    ));
    assert!(!bb.contains("rich"));
}

// ============================================================================
// Trigger Set Tests
// ============================================================================

#[test]
fn test_trigger_file_end_to_end() {
    let yaml = r#"
blackboard:
  fields:
    gold:
      type: number
      default: 20
    quest.done:
      type: boolean

triggers:
  - id: can_buy_sword
    when: "gold >= 50"
    description: "Sword costs 50 gold"
  - id: reward_ready
    when: "quest.done && !(gold > 100)"
  - id: broken
    when: "gold >"
"#;
    let file = TriggerLoader::parse_yaml(yaml).unwrap();
    let mut bb = MemoryBlackboard::new(&file.blackboard).unwrap();
    let mut set = TriggerSet::from_definitions(&file.triggers).unwrap();

    let failures = set.link_all(&mut bb);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "broken");
    assert!(set.active_ids().is_empty());

    bb.set("quest.done", true).unwrap();
    bb.set("gold", 60.0).unwrap();
    assert_eq!(set.active_ids(), vec!["can_buy_sword", "reward_ready"]);
    assert_eq!(
        set.poll_transitions(),
        vec![
            Transition {
                id: "reward_ready".to_string(),
                active: true
            },
            Transition {
                id: "can_buy_sword".to_string(),
                active: true
            },
        ]
    );

    bb.set("gold", 150.0).unwrap();
    assert_eq!(set.active_ids(), vec!["can_buy_sword"]);
    assert_eq!(
        set.poll_transitions(),
        vec![Transition {
            id: "reward_ready".to_string(),
            active: false
        }]
    );

    set.unlink_all(&mut bb);
    assert_eq!(bb.ref_count("gold"), 0);
    assert!(set.active_ids().is_empty());
}

#[test]
fn test_duplicate_ids_in_file() {
    let json = r#"{
        "triggers": [
            { "id": "a", "when": "x" },
            { "id": "a", "when": "y" }
        ]
    }"#;
    let file = TriggerLoader::parse_json(json).unwrap();
    let err = TriggerSet::from_definitions(&file.triggers).unwrap_err();
    assert!(matches!(err, TriggerError::DuplicateTrigger { .. }));
}

#[test]
fn test_observable_seam_accepts_custom_sources() {
    struct Constant(Value);

    impl Observable for Constant {
        fn get_value(&self) -> Value {
            self.0.clone()
        }

        fn subscribe(&self, _listener: trigger_rs::expression::Listener) -> trigger_rs::expression::Subscription {
            trigger_rs::expression::Subscription::inert()
        }
    }

    let root = compile_reactive_expression("limit - 1").unwrap();
    root.operands()[0]
        .connect_source(Rc::new(Constant(Value::Number(10.0))))
        .unwrap();
    assert_eq!(root.get_value(), Ok(Value::Number(9.0)));
}
