//! The contract every pluggable module implements
//!
//! A module is a self-contained, independently enableable unit of pipeline
//! logic. The manager constructs it, hands it its configuration subtree via
//! [`Module::initialize`], lets it look at its siblings once every module has
//! been initialized via [`Module::connect_with_modules`], and afterwards asks
//! it for environment variables and command-line commands.

use anyhow::Result;
use std::any::Any;
use std::collections::BTreeMap;

use crate::command_tree::CommandGroup;
use crate::manager::{ManagerHandle, ModuleInstance};
use crate::settings::ModuleConfig;

/// Environment variables contributed by one module
pub type EnvironmentContribution = BTreeMap<String, String>;

/// Upcast helper so trait objects can be downcast to their concrete type
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub trait Module: AsAny + Send + Sync {
    /// Stable, non-empty identifier. Queried before initialization.
    fn name(&self) -> &str;

    /// Set up internal state from this module's configuration subtree.
    /// Other modules may not exist yet.
    fn initialize(&mut self, ctx: &ModuleContext, config: &ModuleConfig) -> Result<()>;

    /// Establish references to sibling modules. Called once, after every
    /// module has been through initialization.
    fn connect_with_modules(&mut self, _modules: &EnabledModules<'_>) -> Result<()> {
        Ok(())
    }

    /// Environment variables this module wants set for the hosting process.
    /// Must not have side effects.
    fn get_global_environments(&self) -> EnvironmentContribution {
        EnvironmentContribution::new()
    }

    /// Attach this module's commands to its own command group
    fn cli(&self, _group: &mut CommandGroup) {}
}

impl dyn Module {
    pub fn downcast_ref<T: Module>(&self) -> Option<&T> {
        AsAny::as_any(self).downcast_ref::<T>()
    }
}

/// Per-module context handed out at initialization
///
/// Carries the module's diagnostic namespace (a `module` span with the module
/// name) and a non-owning handle to the manager. Modules may keep a clone.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    name: String,
    span: tracing::Span,
    manager: ManagerHandle,
}

impl ModuleContext {
    pub(crate) fn new(name: &str, manager: ManagerHandle) -> Self {
        Self {
            name: name.to_string(),
            span: tracing::info_span!("module", name = %name),
            manager,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Span every diagnostic of this module should be emitted in
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn manager(&self) -> &ManagerHandle {
        &self.manager
    }

    /// Whether this module made it through the connection pass
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected(&self.name)
    }
}

/// Read-only view of the other initialized modules, in instantiation order
pub struct EnabledModules<'a> {
    modules: Vec<&'a ModuleInstance>,
}

impl<'a> EnabledModules<'a> {
    pub(crate) fn new(modules: Vec<&'a ModuleInstance>) -> Self {
        Self { modules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ModuleInstance> + '_ {
        self.modules.iter().copied()
    }

    pub fn get(&self, name: &str) -> Option<&'a ModuleInstance> {
        self.modules.iter().copied().find(|m| m.name() == name)
    }

    /// Look up a sibling and downcast it to its concrete type
    pub fn get_as<T: Module>(&self, name: &str) -> Option<&'a T> {
        self.get(name).and_then(|m| m.downcast_ref::<T>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
