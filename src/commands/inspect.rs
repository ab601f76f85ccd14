use anyhow::Result;
use serde_json::json;
use std::path::Path;

pub fn inspect_command(settings: &Path, name: &str) -> Result<()> {
    let (_registry, manager) = super::load_manager(settings)?;
    let instance = manager.get_module(name)?;
    let report = manager.report().into_iter().find(|r| r.name == name);
    let commands = manager
        .build_command_tree()
        .group(name)
        .map(|group| group.command_names().into_iter().map(String::from).collect())
        .unwrap_or_else(Vec::<String>::new);

    let details = json!({
        "name": instance.name(),
        "id": instance.id().to_string(),
        "config_key": instance.descriptor().config_key(),
        "requires": instance.descriptor().requires_modules(),
        "enabled": instance.enabled(),
        "status": report.as_ref().map(|r| r.status),
        "settings": instance.config().fields(),
        "environment": instance.module().get_global_environments(),
        "commands": commands,
    });

    println!("{}", serde_json::to_string_pretty(&details)?);
    Ok(())
}
