//! Environment variable overrides.
//!
//! The development-mode flag and the profile opt-out are usually supplied
//! by the surrounding system rather than the config file.

use crate::config::schema::ModGraphConfig;

/// Enables development mode when `true` or `1`.
pub const DEV_MODE_VAR: &str = "MODGRAPH_DEV_MODE";

/// Overrides `jre_profile`.
pub const JRE_PROFILE_VAR: &str = "MODGRAPH_JRE_PROFILE";

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

impl ModGraphConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|key| std::env::var(key));
    }

    /// Apply overrides using a custom lookup.
    pub fn apply_env_overrides_with<F>(&mut self, env_fn: F)
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        if let Ok(value) = env_fn(DEV_MODE_VAR) {
            match parse_flag(&value) {
                Some(flag) => self.development_mode = flag,
                None => tracing::warn!(var = DEV_MODE_VAR, value = %value, "ignoring invalid flag"),
            }
        }
        if let Ok(value) = env_fn(JRE_PROFILE_VAR) {
            let value = value.trim();
            if !value.is_empty() {
                self.jre_profile = Some(value.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env::VarError;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn dev_mode_flag_overrides_config() {
        let mut config = ModGraphConfig::default();
        config.apply_env_overrides_with(lookup(&[(DEV_MODE_VAR, "1")]));
        assert!(config.development_mode);

        config.apply_env_overrides_with(lookup(&[(DEV_MODE_VAR, "false")]));
        assert!(!config.development_mode);
    }

    #[test]
    fn invalid_flag_is_ignored() {
        let mut config = ModGraphConfig {
            development_mode: true,
            ..Default::default()
        };
        config.apply_env_overrides_with(lookup(&[(DEV_MODE_VAR, "maybe")]));
        assert!(config.development_mode);
    }

    #[test]
    fn jre_profile_override() {
        let mut config = ModGraphConfig::default();
        config.apply_env_overrides_with(lookup(&[(JRE_PROFILE_VAR, "none")]));
        assert_eq!(config.jre_profile.as_deref(), Some("none"));
    }

    #[test]
    fn missing_variables_leave_config_alone() {
        let mut config = ModGraphConfig::default();
        config.apply_env_overrides_with(lookup(&[]));
        assert_eq!(config, ModGraphConfig::default());
    }
}
