//! Configuration file discovery and loading.

use crate::config::schema::ModGraphConfig;
use crate::error::{ModGraphError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding project configuration.
pub const CONFIG_DIR: &str = ".modgraph";

/// Project configuration file name.
pub const CONFIG_FILE: &str = "config.yml";

/// Project config path: `.modgraph/config.yml`.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Find the project root by walking up from `start`.
///
/// Looks for a `.modgraph` directory first and a `.git` directory as the
/// fallback.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(CONFIG_DIR).is_dir() {
            return Some(current);
        }

        if current.join(".git").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load a single config file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<ModGraphConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ModGraphError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ModGraphError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content. An empty document is the default config.
pub fn parse_config(content: &str, source_path: &Path) -> Result<ModGraphConfig> {
    if content.trim().is_empty() {
        return Ok(ModGraphConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ModGraphError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load config with optional path override.
///
/// An override must exist. Without one, the project config is used when
/// present and the defaults otherwise.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<ModGraphConfig> {
    if let Some(override_path) = config_override {
        return load_config_file(override_path);
    }
    let path = project_config_path(project_root);
    if path.exists() {
        load_config_file(&path)
    } else {
        tracing::debug!(path = %path.display(), "no project config, using defaults");
        Ok(ModGraphConfig::default())
    }
}
