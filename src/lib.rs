// SPDX-License-Identifier: MIT

//! Reactive boolean triggers over a blackboard of named values
//!
//! A trigger is a small expression such as
//! `quest.accepted && player.level >= 5`. It is compiled once into a graph
//! of expression nodes, linked to the blackboard values it names, and from
//! then on kept up to date incrementally as those values change.

pub mod blackboard;
pub mod error;
pub mod expression;
pub mod trigger;

pub use blackboard::{Blackboard, MemoryBlackboard, ObservableValue};
pub use error::{BlackboardError, NodeError, SyntaxError, TriggerError};
pub use expression::{compile_reactive_expression, DataType, Value};
pub use trigger::{Trigger, TriggerSet};
