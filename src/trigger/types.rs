// SPDX-License-Identifier: MIT

use crate::blackboard::BlackboardSchema;
use serde::{Deserialize, Serialize};

/// Top-level trigger definition file
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TriggerFile {
    #[serde(default)]
    pub blackboard: BlackboardSchema,
    #[serde(default)]
    pub triggers: Vec<TriggerDefinition>,
}

/// One named trigger
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TriggerDefinition {
    pub id: String,
    /// Expression source, e.g. `quest.accepted && player.level >= 5`
    pub when: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
