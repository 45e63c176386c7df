//! Configuration schema definitions.
//!
//! These structs map to `.modgraph/config.yml`. Every field is optional.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::environment::{ExecutionEnvironment, PlatformInfo, ProjectRuntime, StaticProfiles};
use crate::manifest::{DevClasspathWeaver, ManifestSource, StateHooks};
use crate::state::ModuleGraphState;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModGraphConfig {
    /// Inject execution environments and weave development classpaths for
    /// modules under development.
    #[serde(default, skip_serializing_if = "is_false")]
    pub development_mode: bool,

    /// Set to `none` to run without execution environment profiles when
    /// none are installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jre_profile: Option<String>,

    /// Platform the modules are resolved for. Defaults to the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformInfo>,

    /// Installed execution environment profiles, in preference order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<EnvironmentConfig>,

    /// Runtime the development projects build against, e.g. `JavaSE-11`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_runtime: Option<String>,

    /// Symbolic name of the foundational module.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_module: Option<String>,

    /// Development classpath entries woven into `Bundle-ClassPath`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_classpath: Option<DevClasspathConfig>,
}

/// One execution environment profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub id: String,

    /// Packages the runtime itself provides.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_packages: Vec<String>,
}

/// Development classpath configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevClasspathConfig {
    /// Entries for modules without their own entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default: Vec<String>,

    /// Entries by symbolic name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub entries: HashMap<String, Vec<String>>,

    /// Drop the `.` entry from woven classpaths.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_dot: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl ModGraphConfig {
    /// Configured profiles, normalized.
    pub fn execution_environments(&self) -> Vec<ExecutionEnvironment> {
        self.environments
            .iter()
            .map(|env| {
                ExecutionEnvironment::new(env.id.clone())
                    .with_system_packages(env.system_packages.iter().cloned())
                    .normalized()
            })
            .collect()
    }

    /// Parsed project runtime, if configured and well formed.
    pub fn runtime(&self) -> Option<ProjectRuntime> {
        self.project_runtime
            .as_deref()
            .and_then(ProjectRuntime::from_id)
    }

    /// Manifest source for modules under development.
    pub fn project_source(&self) -> ManifestSource {
        ManifestSource::Project {
            runtime: self.runtime(),
        }
    }

    /// Build a graph state wired to this configuration.
    pub fn build_state(&self) -> ModuleGraphState {
        let mut hooks = StateHooks::builder();
        if let Some(dev) = self.dev_classpath.as_ref().filter(|_| self.development_mode) {
            let weaver = DevClasspathWeaver::new(dev.default.clone(), dev.entries.clone())
                .ignore_dot(dev.ignore_dot);
            hooks = hooks.weaver(Arc::new(weaver));
        }

        let mut builder = ModuleGraphState::builder()
            .profiles(Arc::new(StaticProfiles(self.execution_environments())))
            .jre_profile(self.jre_profile.clone())
            .development_mode(self.development_mode)
            .hooks(hooks.build());
        if let Some(platform) = &self.platform {
            builder = builder.platform(platform.clone());
        }
        if let Some(name) = &self.system_module {
            builder = builder.system_module(name.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_is_default_config() {
        let config: ModGraphConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ModGraphConfig::default());
    }

    #[test]
    fn parses_full_config() {
        let yaml = r#"
development_mode: true
jre_profile: none
platform:
  os: linux
  ws: gtk
project_runtime: JavaSE-11
environments:
  - id: J2SE-1.5
  - id: JavaSE-11
    system_packages: [javax.xml, javax.sql]
dev_classpath:
  default: [bin]
  entries:
    org.example: [target/classes]
  ignore_dot: true
"#;
        let config: ModGraphConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.development_mode);
        assert_eq!(config.jre_profile.as_deref(), Some("none"));
        let platform = config.platform.as_ref().unwrap();
        assert_eq!(platform.os, "linux");
        assert!(!platform.arch.is_empty());
        let envs = config.execution_environments();
        assert_eq!(envs[0].family, "JavaSE");
        assert_eq!(envs[1].system_packages, vec!["javax.xml", "javax.sql"]);
        assert!(config.runtime().is_some());
        assert!(config.dev_classpath.unwrap().ignore_dot);
    }

    #[test]
    fn unknown_runtime_is_none() {
        let config = ModGraphConfig {
            project_runtime: Some("not a runtime".into()),
            ..Default::default()
        };
        assert_eq!(config.project_source(), ManifestSource::Project { runtime: None });
    }

    #[test]
    fn build_state_uses_configured_environments() {
        let config = ModGraphConfig {
            environments: vec![EnvironmentConfig {
                id: "P-11".into(),
                system_packages: vec![],
            }],
            system_module: Some("org.example.runtime".into()),
            ..Default::default()
        };
        let state = config.build_state();
        let known = state.known_environments().unwrap();
        assert_eq!(known[0].id, "P-11");
        assert_eq!(state.system_module(), "org.example.runtime");
        assert!(!state.is_development_mode());
    }
}
