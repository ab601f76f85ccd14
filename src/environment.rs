//! Merging of per-module environment contributions
//!
//! Modules are merged in instantiation order and a later module overrides an
//! earlier one for the same variable. Overrides are logged, never an error.

use serde::Serialize;
use std::collections::BTreeMap;
use std::process::Command;
use tracing::{debug, warn};

use crate::module::EnvironmentContribution;

/// Environment produced by all active modules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedEnvironment {
    variables: BTreeMap<String, String>,
    /// Module that supplied the final value of each variable
    origins: BTreeMap<String, String>,
}

impl MergedEnvironment {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn origin(&self, name: &str) -> Option<&str> {
        self.origins.get(name).map(String::as_str)
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Set every variable on a child process about to be launched
    pub fn apply(&self, command: &mut Command) {
        command.envs(&self.variables);
    }

    /// `export NAME='value'` lines, one per variable
    pub fn to_shell(&self) -> String {
        self.variables
            .iter()
            .map(|(name, value)| format!("export {name}='{}'\n", value.replace('\'', r"'\''")))
            .collect()
    }
}

pub struct EnvironmentAggregator;

impl EnvironmentAggregator {
    /// Merge `(module name, contribution)` pairs in the order given
    pub fn merge<'a, I>(contributions: I) -> MergedEnvironment
    where
        I: IntoIterator<Item = (&'a str, EnvironmentContribution)>,
    {
        let mut merged = MergedEnvironment::default();

        for (module, contribution) in contributions {
            for (name, value) in contribution {
                if !is_valid_name(&name) || value.contains('\0') {
                    warn!(module = %module, variable = %name, "Skipping environment variable that cannot be set");
                    continue;
                }

                if let Some(previous) = merged.origins.get(&name) {
                    debug!(
                        variable = %name,
                        previous = %previous,
                        module = %module,
                        "Environment variable overridden"
                    );
                }

                merged.origins.insert(name.clone(), module.to_string());
                merged.variables.insert(name, value);
            }
        }

        merged
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('=') && !name.contains('\0')
}
