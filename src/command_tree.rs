//! Command surface assembled from module contributions
//!
//! Every active module gets its own [`CommandGroup`], named after the module,
//! so a module can only ever add commands under its own namespace. Groups that
//! stay empty are left out of the tree.

use anyhow::{Result, anyhow, bail};
use clap::{ArgMatches, Command};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::manager::ModuleInstance;

/// Runs a module command with the matches of that command
pub type CommandHandler = Arc<dyn Fn(&ArgMatches) -> Result<()> + Send + Sync>;

#[derive(Clone)]
struct ModuleCommand {
    command: Command,
    handler: CommandHandler,
}

/// Handle through which one module registers its commands
#[derive(Clone)]
pub struct CommandGroup {
    name: String,
    about: Option<String>,
    commands: Vec<ModuleCommand>,
}

impl CommandGroup {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            about: None,
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text shown for the module's group
    pub fn about(&mut self, about: impl Into<String>) -> &mut Self {
        self.about = Some(about.into());
        self
    }

    /// Register a command. Nested sub-commands are ordinary clap sub-commands
    /// of `command`; the handler receives the matches of `command`.
    /// A second command with an existing name is ignored.
    pub fn add_command<F>(&mut self, command: Command, handler: F) -> &mut Self
    where
        F: Fn(&ArgMatches) -> Result<()> + Send + Sync + 'static,
    {
        if self.find(command.get_name()).is_some() {
            warn!(
                module = %self.name,
                command = %command.get_name(),
                "Ignoring duplicate module command"
            );
            return self;
        }

        self.commands.push(ModuleCommand {
            command,
            handler: Arc::new(handler),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.command.get_name()).collect()
    }

    fn find(&self, name: &str) -> Option<&ModuleCommand> {
        self.commands.iter().find(|c| c.command.get_name() == name)
    }

    fn to_clap(&self) -> Command {
        // Module and command names may be `help`
        let mut group = Command::new(self.name.clone())
            .disable_help_subcommand(true)
            .subcommand_required(true)
            .arg_required_else_help(true);
        if let Some(about) = &self.about {
            group = group.about(about.clone());
        }
        group.subcommands(self.commands.iter().map(|c| c.command.clone()))
    }
}

impl fmt::Debug for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandGroup")
            .field("name", &self.name)
            .field("commands", &self.command_names())
            .finish()
    }
}

/// Aggregate command tree: module name -> that module's commands
#[derive(Debug, Clone, Default)]
pub struct CommandTree {
    groups: Vec<CommandGroup>,
}

impl CommandTree {
    pub(crate) fn build(instances: &[ModuleInstance]) -> Self {
        let mut groups = Vec::new();

        for instance in instances {
            let mut group = CommandGroup::new(instance.name());
            instance
                .context()
                .span()
                .in_scope(|| instance.module().cli(&mut group));
            if !group.is_empty() {
                groups.push(group);
            }
        }

        Self { groups }
    }

    pub fn groups(&self) -> &[CommandGroup] {
        &self.groups
    }

    pub fn group(&self, module: &str) -> Option<&CommandGroup> {
        self.groups.iter().find(|g| g.name() == module)
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Attach one sub-command per module group to `root`. Clap's generated
    /// `help` sub-command is turned off so it cannot shadow a module.
    pub fn attach(&self, root: Command) -> Command {
        self.groups.iter().fold(
            root.disable_help_subcommand(true),
            |root, group| root.subcommand(group.to_clap()),
        )
    }

    /// Run the handler selected by `matches`, which must come from a command
    /// produced by [`CommandTree::attach`]
    pub fn dispatch(&self, matches: &ArgMatches) -> Result<()> {
        let Some((module, module_matches)) = matches.subcommand() else {
            bail!("No module given");
        };
        let group = self
            .group(module)
            .ok_or_else(|| anyhow!("Module `{module}` has no commands"))?;

        let Some((command, command_matches)) = module_matches.subcommand() else {
            bail!("No command given for module `{module}`");
        };
        let entry = group
            .find(command)
            .ok_or_else(|| anyhow!("Module `{module}` has no command `{command}`"))?;

        (entry.handler)(command_matches)
    }
}
