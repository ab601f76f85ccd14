use anyhow::Result;
use std::path::Path;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum EnvFormat {
    /// `export NAME='value'` lines
    Shell,
    /// JSON object of variables
    Json,
}

pub fn env_command(settings: &Path, format: EnvFormat) -> Result<()> {
    let (_registry, manager) = super::load_manager(settings)?;
    let environment = manager.collect_global_environments();

    match format {
        EnvFormat::Shell => print!("{}", environment.to_shell()),
        EnvFormat::Json => {
            let json = serde_json::to_string_pretty(environment.variables())?;
            println!("{json}");
        }
    }

    Ok(())
}
