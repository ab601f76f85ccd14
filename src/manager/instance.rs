use once_cell::sync::OnceCell;
use std::fmt;
use uuid::Uuid;

use crate::module::{Module, ModuleContext};
use crate::registry::ModuleDescriptor;
use crate::settings::ModuleConfig;

/// A live module owned by the manager
pub struct ModuleInstance {
    pub(crate) module: Box<dyn Module>,
    descriptor: ModuleDescriptor,
    config: ModuleConfig,
    context: ModuleContext,
    id: OnceCell<Uuid>,
}

impl ModuleInstance {
    pub(crate) fn new(
        descriptor: ModuleDescriptor,
        module: Box<dyn Module>,
        config: ModuleConfig,
        context: ModuleContext,
    ) -> Self {
        Self {
            module,
            descriptor,
            config,
            context,
            id: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled()
    }

    /// Identifier for the lifetime of this instance, generated on first access
    pub fn id(&self) -> Uuid {
        *self.id.get_or_init(Uuid::new_v4)
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn context(&self) -> &ModuleContext {
        &self.context
    }

    pub fn module(&self) -> &dyn Module {
        self.module.as_ref()
    }

    pub fn downcast_ref<T: Module>(&self) -> Option<&T> {
        self.module().downcast_ref::<T>()
    }
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("name", &self.name())
            .field("enabled", &self.enabled())
            .field("id", &self.id.get())
            .finish_non_exhaustive()
    }
}
