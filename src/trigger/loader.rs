// SPDX-License-Identifier: MIT

//! Trigger file loader
//!
//! Files ending in `.json` are read as JSON, anything else as YAML.

use super::types::TriggerFile;
use crate::error::TriggerError;
use std::fs;
use std::path::Path;

/// Loads trigger definition files
pub struct TriggerLoader;

impl TriggerLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a trigger file from disk
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<TriggerFile, TriggerError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let file = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&content)?,
            _ => Self::parse_yaml(&content)?,
        };
        log::debug!(
            "Loaded {} triggers from {}",
            file.triggers.len(),
            path.display()
        );
        Ok(file)
    }

    /// Parse a trigger file from a YAML string
    pub fn parse_yaml(content: &str) -> Result<TriggerFile, TriggerError> {
        let file: TriggerFile = serde_yaml::from_str(content)?;
        Ok(file)
    }

    /// Parse a trigger file from a JSON string
    pub fn parse_json(content: &str) -> Result<TriggerFile, TriggerError> {
        let file: TriggerFile = serde_json::from_str(content)?;
        Ok(file)
    }
}

impl Default for TriggerLoader {
    fn default() -> Self {
        Self::new()
    }
}
