//! Settings file loading: a main YAML file plus optional split fragments

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::merger::ConfigMerger;
use super::schema::SettingsValidator;
use super::ConfigRoot;

/// Settings file looked up when a directory is given
pub const DEFAULT_SETTINGS_FILE: &str = "modules.yml";

/// Directory next to the main file holding per-module fragments
pub const FRAGMENTS_DIR: &str = "modules.d";

pub struct SettingsLoader {
    path: PathBuf,
}

impl SettingsLoader {
    /// `path` may point at a settings file or at a directory containing
    /// `modules.yml` and/or `modules.d/`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load, merge and validate the settings
    pub fn load(&self) -> Result<ConfigRoot> {
        let (main_path, fragments_dir) = self.locations();

        if !main_path.exists() && !fragments_dir.is_dir() {
            anyhow::bail!(
                "Module settings not found: {} (and no {} directory)",
                main_path.display(),
                FRAGMENTS_DIR
            );
        }

        let base = if main_path.exists() {
            Self::read_yaml(&main_path)?
        } else {
            JsonValue::Object(Default::default())
        };

        let mut fragments = Vec::new();
        for path in Self::scan_fragments(&fragments_dir)? {
            let fragment = Self::read_yaml(&path)?;
            fragments.push((path, fragment));
        }

        let merged = if fragments.is_empty() {
            base
        } else {
            debug!("Merging {} settings fragments", fragments.len());
            ConfigMerger::new().merge_configs(base, fragments)
        };

        SettingsValidator::new().validate(&merged, &main_path)?;

        let root = ConfigRoot::new(merged)?;
        info!("Loaded settings for {} modules", root.as_map().len());
        Ok(root)
    }

    fn locations(&self) -> (PathBuf, PathBuf) {
        if self.path.is_dir() {
            (
                self.path.join(DEFAULT_SETTINGS_FILE),
                self.path.join(FRAGMENTS_DIR),
            )
        } else {
            let parent = self
                .path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            (self.path.clone(), parent.join(FRAGMENTS_DIR))
        }
    }

    fn read_yaml(path: &Path) -> Result<JsonValue> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// YAML fragments directly inside `dir`, sorted by file name
    fn scan_fragments(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if !dir.is_dir() {
            return Ok(files);
        }

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
            let path = entry.path();
            if entry.file_type().is_file() && is_yaml_file(path) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext, "yml" | "yaml"))
        .unwrap_or(false)
}
