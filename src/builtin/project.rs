use anyhow::{Context, Result};
use clap::Command;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::command_tree::CommandGroup;
use crate::module::{EnvironmentContribution, Module, ModuleContext};
use crate::settings::ModuleConfig;

pub const PROJECT_NAME_VAR: &str = "PIPELINE_PROJECT_NAME";
pub const PROJECT_ROOT_VAR: &str = "PIPELINE_PROJECT_ROOT";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectSettings {
    name: Option<String>,
    root: Option<PathBuf>,
    /// Extra variables exported as-is
    environment: BTreeMap<String, String>,
}

/// Exposes the active project to the rest of the pipeline
#[derive(Debug, Default)]
pub struct ProjectModule {
    project_name: String,
    root: Option<PathBuf>,
    environment: EnvironmentContribution,
}

impl ProjectModule {
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl Module for ProjectModule {
    fn name(&self) -> &str {
        "project"
    }

    fn initialize(&mut self, _ctx: &ModuleContext, config: &ModuleConfig) -> Result<()> {
        let settings: ProjectSettings = config.deserialize()?;

        self.project_name = settings
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .context("setting `name` is required")?;
        self.root = settings.root;
        self.environment = settings.environment;

        info!("Active project: {}", self.project_name);
        Ok(())
    }

    fn get_global_environments(&self) -> EnvironmentContribution {
        let mut env = self.environment.clone();
        env.insert(PROJECT_NAME_VAR.to_string(), self.project_name.clone());
        if let Some(root) = &self.root {
            env.insert(PROJECT_ROOT_VAR.to_string(), root.display().to_string());
        }
        env
    }

    fn cli(&self, group: &mut CommandGroup) {
        let name = self.project_name.clone();
        let root = self.root.clone();

        group.about("Active project").add_command(
            Command::new("show").about("Print the active project"),
            move |_| {
                println!("{name}");
                if let Some(root) = &root {
                    println!("{}", root.display());
                }
                Ok(())
            },
        );
    }
}
