use anyhow::{Context, Result, bail};
use clap::{Arg, Command, value_parser};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::project::ProjectModule;
use crate::command_tree::CommandGroup;
use crate::module::{EnabledModules, EnvironmentContribution, Module, ModuleContext};
use crate::settings::ModuleConfig;

pub const WORKDIR_VAR: &str = "PIPELINE_WORKDIR";
pub const EXTENSIONS_VAR: &str = "PIPELINE_WORKFILE_EXTENSIONS";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WorkfilesSettings {
    extensions: Vec<String>,
    subdir: PathBuf,
}

impl Default for WorkfilesSettings {
    fn default() -> Self {
        Self {
            extensions: vec![".tvpp".to_string()],
            subdir: PathBuf::from("work"),
        }
    }
}

/// Workfile naming and location inside the active project
#[derive(Debug, Default)]
pub struct WorkfilesModule {
    extensions: Vec<String>,
    subdir: PathBuf,
    workdir: Option<PathBuf>,
}

impl WorkfilesModule {
    /// Accepted extensions, lowercase with a leading dot
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    pub fn is_workfile(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// `<workdir>/<task>_v<version>.<ext>` using the first extension
    pub fn workfile_path(&self, task: &str, version: u32) -> Option<PathBuf> {
        let workdir = self.workdir.as_ref()?;
        let extension = self.extensions.first()?;
        Some(workdir.join(format_workfile_name(task, version, extension)))
    }
}

fn format_workfile_name(task: &str, version: u32, extension: &str) -> String {
    format!("{task}_v{version:03}{extension}")
}

fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(format!(".{ext}"))
    }
}

impl Module for WorkfilesModule {
    fn name(&self) -> &str {
        "workfiles"
    }

    fn initialize(&mut self, _ctx: &ModuleContext, config: &ModuleConfig) -> Result<()> {
        let settings: WorkfilesSettings = config.deserialize()?;

        let mut extensions = Vec::new();
        for raw in &settings.extensions {
            if let Some(ext) = normalize_extension(raw)
                && !extensions.contains(&ext)
            {
                extensions.push(ext);
            }
        }
        if extensions.is_empty() {
            bail!("setting `extensions` must list at least one extension");
        }

        self.extensions = extensions;
        self.subdir = settings.subdir;
        Ok(())
    }

    fn connect_with_modules(&mut self, modules: &EnabledModules<'_>) -> Result<()> {
        let project = modules
            .get_as::<ProjectModule>("project")
            .context("the `project` module is not available")?;

        self.workdir = project.root().map(|root| root.join(&self.subdir));
        match &self.workdir {
            Some(workdir) => debug!("Workfiles directory: {}", workdir.display()),
            None => debug!("Project has no root, workfile paths are unavailable"),
        }
        Ok(())
    }

    fn get_global_environments(&self) -> EnvironmentContribution {
        let mut env = EnvironmentContribution::new();
        env.insert(EXTENSIONS_VAR.to_string(), self.extensions.join(","));
        if let Some(workdir) = &self.workdir {
            env.insert(WORKDIR_VAR.to_string(), workdir.display().to_string());
        }
        env
    }

    fn cli(&self, group: &mut CommandGroup) {
        let extensions = self.extensions.clone();
        let workdir = self.workdir.clone();
        let first_extension = self.extensions.first().cloned();

        group
            .about("Workfile naming and locations")
            .add_command(
                Command::new("extensions").about("List accepted workfile extensions"),
                move |_| {
                    for ext in &extensions {
                        println!("{ext}");
                    }
                    Ok(())
                },
            )
            .add_command(
                Command::new("path")
                    .about("Print the path of a workfile")
                    .arg(Arg::new("task").required(true).help("Task name"))
                    .arg(
                        Arg::new("version")
                            .long("version")
                            .value_parser(value_parser!(u32))
                            .default_value("1")
                            .help("Workfile version"),
                    ),
                move |matches| {
                    let task = matches
                        .get_one::<String>("task")
                        .context("missing task")?;
                    let version = matches.get_one::<u32>("version").copied().unwrap_or(1);
                    let (Some(workdir), Some(ext)) = (&workdir, &first_extension) else {
                        bail!("The active project has no root directory");
                    };
                    println!(
                        "{}",
                        workdir.join(format_workfile_name(task, version, ext)).display()
                    );
                    Ok(())
                },
            );
    }
}
