mod env;
mod inspect;
mod list;
mod module;

pub use env::{EnvFormat, env_command};
pub use inspect::inspect_command;
pub use list::list_command;
pub use module::module_command;

use anyhow::Result;
use modman::{ModuleRegistry, ModulesManager, SettingsLoader};
use std::path::Path;

/// Load the settings and bring up a manager over the bundled modules
pub(crate) fn load_manager(settings: &Path) -> Result<(ModuleRegistry, ModulesManager)> {
    let config = SettingsLoader::new(settings).load()?;
    let registry = ModuleRegistry::builtin();
    let manager = ModulesManager::from_registry(&registry, &config)?;
    Ok((registry, manager))
}
