// SPDX-License-Identifier: MIT

//! Triggers: compiled expressions bound to a blackboard
//!
//! - `Trigger` - one expression with its link/unlink lifecycle
//! - `TriggerSet` - named triggers managed together, with activation transitions
//! - `TriggerLoader` - YAML/JSON trigger files

mod binding;
mod loader;
mod set;
mod types;

pub use binding::{ReferenceGroup, Trigger};
pub use loader::TriggerLoader;
pub use set::{Transition, TriggerSet};
pub use types::{TriggerDefinition, TriggerFile};
