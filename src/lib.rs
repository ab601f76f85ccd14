pub mod builtin;
pub mod command_tree;
pub mod environment;
pub mod error;
pub mod graph;
pub mod manager;
pub mod module;
pub mod registry;
pub mod settings;

pub use command_tree::{CommandGroup, CommandTree};
pub use environment::{EnvironmentAggregator, MergedEnvironment};
pub use error::ModuleError;
pub use manager::{ManagerHandle, ModuleInstance, ModuleReport, ModulesManager};
pub use module::{EnabledModules, EnvironmentContribution, Module, ModuleContext};
pub use registry::{Discoverer, ModuleDescriptor, ModuleRegistry};
pub use settings::{ConfigRoot, ModuleConfig, SettingsLoader};
