use anyhow::Result;
use clap::Command;
use std::path::Path;

pub fn module_command(settings: &Path, args: Vec<String>) -> Result<()> {
    let (_registry, manager) = super::load_manager(settings)?;
    let tree = manager.build_command_tree();

    if tree.is_empty() {
        anyhow::bail!("No active module provides commands");
    }

    let command = tree.attach(
        Command::new("module")
            .bin_name("modman module")
            .about("Run a command contributed by a module")
            .subcommand_required(true)
            .arg_required_else_help(true),
    );

    // Exits with clap's usual output on --help or bad arguments
    let matches = command.get_matches_from(std::iter::once("module".to_string()).chain(args));
    tree.dispatch(&matches)
}
