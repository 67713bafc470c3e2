// SPDX-License-Identifier: MIT

//! Declared blackboard fields

use crate::expression::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Blackboard section of a trigger file
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BlackboardSchema {
    /// Reject names that are not declared
    #[serde(default)]
    pub strict: bool,
    /// Declared fields by dotted name
    #[serde(default)]
    pub fields: HashMap<String, FieldDef>,
}

/// Definition of a single blackboard field
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct FieldDef {
    /// Type of the field
    #[serde(rename = "type", default)]
    pub data_type: DataType,
    /// Initial value; the type's zero value when omitted
    #[serde(default)]
    pub default: Option<Value>,
}

impl FieldDef {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn initial_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.data_type.zero_value())
    }
}

impl BlackboardSchema {
    /// Add a declared field
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
