//! Known module implementations and discovery of the enabled ones
//!
//! A [`ModuleRegistry`] is plain, read-only data once built and may be shared
//! between managers. There is no process-wide registry.

mod discovery;

pub use discovery::Discoverer;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::builtin::{ProjectModule, WorkfilesModule};
use crate::error::ModuleError;
use crate::module::Module;

static MODULE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid module name regex"));

/// Builds a fresh, uninitialized module instance
pub type ModuleFactory = Arc<dyn Fn() -> Box<dyn Module> + Send + Sync>;

/// Discovery-time metadata for one module implementation
#[derive(Clone)]
pub struct ModuleDescriptor {
    name: String,
    config_key: String,
    requires: Vec<String>,
    factory: ModuleFactory,
}

impl ModuleDescriptor {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            config_key: name.clone(),
            name,
            requires: Vec::new(),
            factory: Arc::new(factory),
        }
    }

    /// Descriptor for a default-constructible module; the name is read from a
    /// throwaway instance, which is never initialized
    pub fn of<T: Module + Default>() -> Self {
        let sample = T::default();
        Self::new(sample.name(), || Box::new(T::default()))
    }

    /// Read configuration from a key other than the module name
    pub fn with_config_key(mut self, key: impl Into<String>) -> Self {
        self.config_key = key.into();
        self
    }

    /// Modules that must be active before this one initializes
    pub fn requires<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(modules.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    pub fn requires_modules(&self) -> &[String] {
        &self.requires
    }

    pub(crate) fn instantiate(&self) -> Box<dyn Module> {
        (self.factory)()
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("config_key", &self.config_key)
            .field("requires", &self.requires)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of known module implementations
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    descriptors: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the modules bundled in this crate
    pub fn builtin() -> Self {
        Self::new()
            .with(ModuleDescriptor::of::<ProjectModule>())
            .with(ModuleDescriptor::of::<WorkfilesModule>().requires(["project"]))
    }

    /// Add a descriptor. Duplicates are accepted here and reported at discovery.
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn register_module<T: Module + Default>(&mut self) -> &mut Self {
        self.register(ModuleDescriptor::of::<T>())
    }

    pub fn with(mut self, descriptor: ModuleDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn descriptors(&self) -> &[ModuleDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.iter().find(|d| d.name() == name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn discoverer(&self) -> Discoverer<'_> {
        Discoverer::new(self)
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), ModuleError> {
    if MODULE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ModuleError::InvalidModuleName {
            name: name.to_string(),
        })
    }
}

/// Fails on the first name used by more than one descriptor
pub(crate) fn ensure_unique_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), ModuleError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ModuleError::DuplicateModule {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
