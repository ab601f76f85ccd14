//! Module settings: the already-resolved configuration tree modules read from
//!
//! The root is a mapping keyed by module config key. Each value is the
//! configuration subtree for one module, carrying at least an `enabled` flag.

mod loader;
mod merger;
mod schema;

pub use loader::{DEFAULT_SETTINGS_FILE, FRAGMENTS_DIR, SettingsLoader};
pub use merger::ConfigMerger;
pub use schema::{SETTINGS_SCHEMA, SettingsValidator};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::error::ModuleError;

/// Whole settings document, keyed by module config key
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigRoot {
    modules: Map<String, JsonValue>,
}

impl ConfigRoot {
    /// Wrap a parsed settings document. `null` is treated as an empty document.
    pub fn new(value: JsonValue) -> Result<Self, ModuleError> {
        match value {
            JsonValue::Object(modules) => Ok(Self { modules }),
            JsonValue::Null => Ok(Self::default()),
            other => Err(ModuleError::MalformedConfig {
                key: "<root>".to_string(),
                reason: format!("expected a mapping of modules, found {}", kind_of(&other)),
            }),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a YAML settings document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: JsonValue =
            serde_yaml::from_str(content).context("Failed to parse module settings")?;
        Ok(Self::new(value)?)
    }

    /// Configuration subtree for one module. A missing subtree means the module
    /// is disabled.
    pub fn module_config(&self, key: &str) -> Result<ModuleConfig, ModuleError> {
        match self.modules.get(key) {
            None => Ok(ModuleConfig::disabled()),
            Some(value) => ModuleConfig::from_value(key, value),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.modules.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.modules
    }
}

impl From<Map<String, JsonValue>> for ConfigRoot {
    fn from(modules: Map<String, JsonValue>) -> Self {
        Self { modules }
    }
}

/// Configuration subtree of a single module
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleConfig {
    enabled: bool,
    fields: Map<String, JsonValue>,
}

impl ModuleConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build from the raw subtree found under `key`
    pub fn from_value(key: &str, value: &JsonValue) -> Result<Self, ModuleError> {
        let fields = match value {
            JsonValue::Object(fields) => fields.clone(),
            JsonValue::Null => return Ok(Self::disabled()),
            other => {
                return Err(ModuleError::MalformedConfig {
                    key: key.to_string(),
                    reason: format!("expected a mapping, found {}", kind_of(other)),
                });
            }
        };

        let enabled = match fields.get("enabled") {
            None | Some(JsonValue::Null) => false,
            Some(JsonValue::Bool(enabled)) => *enabled,
            Some(other) => {
                return Err(ModuleError::MalformedConfig {
                    key: key.to_string(),
                    reason: format!("`enabled` must be a boolean, found {}", kind_of(other)),
                });
            }
        };

        Ok(Self { enabled, fields })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// All fields of the subtree, `enabled` included
    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    /// Read one field as `T`. Missing and `null` fields yield `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.fields.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .with_context(|| format!("Invalid value for setting `{key}`")),
        }
    }

    /// Deserialize the whole subtree into a typed settings struct
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(JsonValue::Object(self.fields.clone()))
            .context("Failed to deserialize module settings")
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "a mapping",
    }
}
