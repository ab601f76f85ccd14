//! Module discovery
//!
//! Turns the registry plus the settings into the ordered list of descriptors
//! the manager instantiates. Every structural problem is reported here, before
//! any module is constructed.

use tracing::{debug, info};

use super::{ModuleDescriptor, ModuleRegistry, ensure_unique_names, validate_name};
use crate::error::ModuleError;
use crate::graph::DependencyGraph;
use crate::settings::ConfigRoot;

pub struct Discoverer<'a> {
    registry: &'a ModuleRegistry,
}

impl<'a> Discoverer<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Enabled descriptors in instantiation order
    ///
    /// The order is registration order, adjusted only where a module must
    /// follow a module it requires.
    pub fn discover(&self, config: &ConfigRoot) -> Result<Vec<ModuleDescriptor>, ModuleError> {
        let descriptors = self.registry.descriptors();

        for descriptor in descriptors {
            validate_name(descriptor.name())?;
        }
        ensure_unique_names(descriptors.iter().map(|d| d.name()))?;

        let mut enabled = Vec::new();
        for descriptor in descriptors {
            let module_config = config.module_config(descriptor.config_key())?;
            if module_config.enabled() {
                enabled.push(descriptor.clone());
            } else {
                debug!(module = %descriptor.name(), "Module disabled");
            }
        }

        let graph = DependencyGraph::new(&enabled);
        let order = graph.ordered_positions()?;

        let mut slots: Vec<Option<ModuleDescriptor>> = enabled.into_iter().map(Some).collect();
        let ordered: Vec<ModuleDescriptor> = order
            .into_iter()
            .filter_map(|position| slots[position].take())
            .collect();

        info!(
            "Discovered {} enabled of {} registered modules",
            ordered.len(),
            descriptors.len()
        );
        Ok(ordered)
    }
}
