// SPDX-License-Identifier: MIT

//! Blackboards: named, observable values that triggers bind to
//!
//! This module provides:
//! - `Blackboard` - the acquire/release contract the trigger binding consumes
//! - `ObservableValue` - a shared, watchable value cell
//! - `BlackboardSchema` - declared fields, loaded from trigger files
//! - `MemoryBlackboard` - reference-counted in-memory implementation

mod observable;
mod schema;
mod store;

pub use observable::ObservableValue;
pub use schema::{BlackboardSchema, FieldDef};
pub use store::MemoryBlackboard;

use crate::error::BlackboardError;
use crate::expression::DataType;

/// Source of observable values, looked up by dotted name.
///
/// Every successful `acquire` is paired with exactly one `release` of the
/// same name, so implementations may reference count their entries.
pub trait Blackboard {
    /// Get (or create) the value for `name`, checked against `data_type`
    fn acquire(&mut self, name: &str, data_type: DataType)
        -> Result<ObservableValue, BlackboardError>;

    /// Give back a value obtained from `acquire`
    fn release(&mut self, name: &str);
}
