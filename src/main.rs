use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::EnvFormat;

#[derive(Parser)]
#[command(
    name = "modman",
    about = "Discover, initialize and drive pipeline modules",
    version,
    author,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Module settings file, or a directory containing modules.yml and modules.d/
    #[arg(short, long, default_value = "modules.yml", global = true, env = "MODMAN_SETTINGS")]
    settings: PathBuf,

    /// Enable verbose output (use -vv for debug output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered modules and their state (default command)
    List,

    /// Print the environment contributed by the active modules
    Env {
        #[arg(short, long, value_enum, default_value_t = EnvFormat::Shell)]
        format: EnvFormat,
    },

    /// Show details about one active module
    Inspect {
        /// Module name
        name: String,
    },

    /// Run a command contributed by a module
    Module {
        /// Module name, command and its arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::List) | None => commands::list_command(&cli.settings)?,
        Some(Commands::Env { format }) => commands::env_command(&cli.settings, format)?,
        Some(Commands::Inspect { name }) => commands::inspect_command(&cli.settings, &name)?,
        Some(Commands::Module { args }) => commands::module_command(&cli.settings, args)?,
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::new("modman=warn"), // Default: warnings and errors only
        1 => EnvFilter::new("modman=info"), // -v: info messages
        _ => EnvFilter::new("modman=debug"), // -vv or more: full debug
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
