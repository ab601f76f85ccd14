//! Module manager: owns module instances and drives their lifecycle
//!
//! This module is responsible for:
//! - Instantiating discovered modules in order and initializing them
//! - Isolating per-module failures (a failing module is logged and skipped)
//! - The single cross-connection pass once every module was initialized
//! - Environment and command aggregation over the active modules
//! - Dropping modules in reverse instantiation order

mod handle;
mod instance;
mod lifecycle;

pub use handle::ManagerHandle;
pub use instance::ModuleInstance;
pub use lifecycle::ModuleReport;

use once_cell::sync::OnceCell;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::command_tree::CommandTree;
use crate::environment::{EnvironmentAggregator, MergedEnvironment};
use crate::error::ModuleError;
use crate::module::{EnabledModules, Module, ModuleContext};
use crate::registry::{ModuleDescriptor, ModuleRegistry, ensure_unique_names, validate_name};
use crate::settings::{ConfigRoot, ModuleConfig};
use lifecycle::{Lifecycle, StatusBoard};

/// Owns one set of module instances for one process lifetime
pub struct ModulesManager {
    id: Uuid,
    instances: Vec<ModuleInstance>,
    board: Arc<RwLock<StatusBoard>>,
    environment: OnceCell<MergedEnvironment>,
}

impl ModulesManager {
    /// Discover the enabled modules of `registry` and initialize them.
    /// Only structural errors (duplicates, malformed settings, cycles) fail.
    pub fn from_registry(
        registry: &ModuleRegistry,
        config: &ConfigRoot,
    ) -> Result<Self, ModuleError> {
        let descriptors = registry.discoverer().discover(config)?;
        Self::initialize(descriptors, config)
    }

    /// Instantiate and initialize `descriptors` in order, then connect every
    /// module that initialized successfully.
    ///
    /// Descriptors whose settings are not enabled are skipped. A module that
    /// fails to initialize is logged and left out; the rest carry on.
    pub fn initialize(
        descriptors: Vec<ModuleDescriptor>,
        config: &ConfigRoot,
    ) -> Result<Self, ModuleError> {
        for descriptor in &descriptors {
            validate_name(descriptor.name())?;
        }
        ensure_unique_names(descriptors.iter().map(|d| d.name()))?;

        let mut manager = Self {
            id: Uuid::new_v4(),
            instances: Vec::new(),
            board: Arc::new(RwLock::new(StatusBoard::default())),
            environment: OnceCell::new(),
        };

        let mut pending = Vec::new();
        for descriptor in descriptors {
            let module_config = config.module_config(descriptor.config_key())?;
            if module_config.enabled() {
                manager.board_mut().discover(descriptor.name());
                pending.push((descriptor, module_config));
            } else {
                debug!(module = %descriptor.name(), "Skipping disabled module");
            }
        }

        for (descriptor, module_config) in pending {
            let name = descriptor.name().to_string();
            manager.board_mut().advance(&name, Lifecycle::Instantiating);

            match manager.instantiate(descriptor, module_config) {
                Ok(instance) => {
                    manager.board_mut().advance(&name, Lifecycle::Initialized);
                    debug!(module = %name, "Module initialized");
                    manager.instances.push(instance);
                }
                Err(err) => {
                    error!(module = %name, kind = err.kind(), "{}", err.describe());
                    manager
                        .board_mut()
                        .fail(&name, Lifecycle::FailedInit, err.describe());
                }
            }
        }

        manager.connect_modules();

        info!(
            "Modules manager ready: {} active modules",
            manager.instances.len()
        );
        Ok(manager)
    }

    fn instantiate(
        &self,
        descriptor: ModuleDescriptor,
        config: ModuleConfig,
    ) -> Result<ModuleInstance, ModuleError> {
        let name = descriptor.name().to_string();

        for dependency in descriptor.requires_modules() {
            if !self.is_active(dependency) {
                return Err(ModuleError::MissingDependency {
                    module: name,
                    dependency: dependency.clone(),
                });
            }
        }

        let mut module = guarded(|| Ok(descriptor.instantiate())).map_err(|source| {
            ModuleError::Initialization {
                module: name.clone(),
                source,
            }
        })?;
        if module.name() != name {
            return Err(ModuleError::Initialization {
                module: name.clone(),
                source: anyhow::anyhow!(
                    "implementation reports name `{}` instead of `{}`",
                    module.name(),
                    name
                ),
            });
        }

        let context = ModuleContext::new(&name, self.handle());
        guarded(|| {
            context
                .span()
                .in_scope(|| module.initialize(&context, &config))
        })
        .map_err(|source| ModuleError::Initialization {
            module: name.clone(),
            source,
        })?;

        Ok(ModuleInstance::new(descriptor, module, config, context))
    }

    /// Give every initialized module one chance to see its siblings
    fn connect_modules(&mut self) {
        for index in 0..self.instances.len() {
            let (before, rest) = self.instances.split_at_mut(index);
            let Some((current, after)) = rest.split_first_mut() else {
                break;
            };

            let siblings = EnabledModules::new(before.iter().chain(after.iter()).collect());
            let span = current.context().span().clone();
            let result =
                guarded(|| span.in_scope(|| current.module.connect_with_modules(&siblings)));
            let name = current.name().to_string();

            match result {
                Ok(()) => {
                    self.board_mut().advance(&name, Lifecycle::Connected);
                    debug!(module = %name, "Module connected");
                }
                Err(source) => {
                    let err = ModuleError::Connection {
                        module: name.clone(),
                        source,
                    };
                    error!(module = %name, kind = err.kind(), "{}", err.describe());
                    self.board_mut()
                        .fail(&name, Lifecycle::FailedConnect, err.describe());
                }
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Non-owning handle to this manager, as given to its modules
    pub fn handle(&self) -> ManagerHandle {
        ManagerHandle::new(self.id, &self.board)
    }

    /// Active module by name
    pub fn get_module(&self, name: &str) -> Result<&ModuleInstance, ModuleError> {
        self.instances
            .iter()
            .find(|instance| instance.name() == name)
            .ok_or_else(|| ModuleError::NotFound {
                name: name.to_string(),
            })
    }

    /// Active module by name, downcast to its concrete type
    pub fn get_module_as<T: Module>(&self, name: &str) -> Result<&T, ModuleError> {
        self.get_module(name)?
            .downcast_ref::<T>()
            .ok_or_else(|| ModuleError::NotFound {
                name: name.to_string(),
            })
    }

    /// Active modules in instantiation order
    pub fn modules(&self) -> &[ModuleInstance] {
        &self.instances
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.instances.iter().any(|instance| instance.name() == name)
    }

    /// Lifecycle summary of every module this manager attempted
    pub fn report(&self) -> Vec<ModuleReport> {
        self.board
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .reports()
    }

    /// Merged environment of all active modules; computed once
    pub fn collect_global_environments(&self) -> &MergedEnvironment {
        self.environment.get_or_init(|| {
            EnvironmentAggregator::merge(self.instances.iter().map(|instance| {
                let contribution = instance
                    .context()
                    .span()
                    .in_scope(|| instance.module().get_global_environments());
                (instance.name(), contribution)
            }))
        })
    }

    /// Command tree with one group per active module that contributes commands
    pub fn build_command_tree(&self) -> CommandTree {
        CommandTree::build(&self.instances)
    }

    fn board_mut(&self) -> RwLockWriteGuard<'_, StatusBoard> {
        self.board
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Run module code, reporting a panic as an error of that module
fn guarded<T>(f: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(anyhow::anyhow!(
            "module panicked: {}",
            panic_message(&*payload)
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl Drop for ModulesManager {
    fn drop(&mut self) {
        while let Some(instance) = self.instances.pop() {
            debug!(module = %instance.name(), "Dropping module");
            drop(instance);
        }
    }
}
