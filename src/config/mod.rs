//! Configuration loading for modgraph.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Environment variable overrides in [`overrides`]
//!
//! # Example
//!
//! ```
//! use modgraph::config::load_config;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".modgraph");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "jre_profile: none").unwrap();
//!
//! let config = load_config(temp.path(), None).unwrap();
//! assert_eq!(config.jre_profile.as_deref(), Some("none"));
//! ```
//!
//! # Configuration File Locations
//!
//! 1. `--config <path>` when given
//! 2. Project config (`.modgraph/config.yml`)
//! 3. Built-in defaults

pub mod loader;
pub mod overrides;
pub mod schema;

pub use loader::{
    find_project_root, load_config, load_config_file, parse_config, project_config_path,
    CONFIG_DIR, CONFIG_FILE,
};
pub use overrides::{DEV_MODE_VAR, JRE_PROFILE_VAR};
pub use schema::{DevClasspathConfig, EnvironmentConfig, ModGraphConfig};
