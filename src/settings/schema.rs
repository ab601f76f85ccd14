use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

// Use JSON Schema draft-07 for validation
use jsonschema::draft7 as schema_draft;

/// Schema for the merged module settings document, embedded at compile time
pub static SETTINGS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/v1/modules-schema.json"))
        .expect("Failed to parse module settings schema")
});

#[derive(Debug, Default)]
pub struct SettingsValidator;

impl SettingsValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate the shape of a settings document. All schema violations are
    /// collected into a single error.
    pub fn validate(&self, settings: &Value, source: &Path) -> Result<()> {
        let validator = schema_draft::options()
            .build(&SETTINGS_SCHEMA)
            .context("Failed to compile module settings schema")?;

        let errors: Vec<String> = validator
            .iter_errors(settings)
            .map(|error| {
                let instance_path = error.instance_path.to_string();
                if instance_path.is_empty() {
                    error.to_string()
                } else {
                    format!("{instance_path}: {error}")
                }
            })
            .collect();

        if !errors.is_empty() {
            anyhow::bail!(
                "Schema validation failed for {}:\n  - {}",
                source.display(),
                errors.join("\n  - ")
            );
        }

        debug!("✓ Module settings validation passed: {}", source.display());
        Ok(())
    }
}
