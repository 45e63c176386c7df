//! Environments command implementation.
//!
//! `modgraph environments` shows the execution environments the platform
//! knows about and the properties each one contributes to resolution.

use serde::Serialize;

use crate::cli::args::EnvironmentsArgs;
use crate::config::ModGraphConfig;
use crate::environment::{platform_properties, ExecutionEnvironment, PlatformProperties};
use crate::error::{ModGraphError, Result};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

#[derive(Debug, Serialize)]
struct EnvironmentsReport {
    /// `None` in no-profile mode.
    environments: Option<Vec<ExecutionEnvironment>>,
    platform: PlatformProperties,
}

/// The environments command implementation.
pub struct EnvironmentsCommand {
    config: ModGraphConfig,
    args: EnvironmentsArgs,
}

impl EnvironmentsCommand {
    pub fn new(config: ModGraphConfig, args: EnvironmentsArgs) -> Self {
        Self { config, args }
    }

    fn report(&self) -> EnvironmentsReport {
        let state = self.config.build_state();
        let environments = state.known_environments();
        let platform = platform_properties(
            environments.as_deref(),
            &self.config.platform.clone().unwrap_or_default(),
            &state.system_module(),
        );
        EnvironmentsReport {
            environments,
            platform,
        }
    }
}

impl Command for EnvironmentsCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let report = self.report();

        if self.args.json {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| ModGraphError::Other(e.into()))?;
            ui.data(&json);
            return Ok(CommandResult::success());
        }

        let theme = ui.theme();
        ui.show_header("Execution environments");
        match &report.environments {
            None => ui.message("Profile discovery disabled; environment requirements are not enforced"),
            Some(envs) if envs.is_empty() => {
                ui.warning("No execution environment profiles configured")
            }
            Some(envs) => {
                for ee in envs {
                    ui.message(&format!("  {}", theme.highlight.apply_to(&ee.id)));
                    if ui.output_mode().shows_detail() && !ee.system_packages.is_empty() {
                        ui.message(&format!(
                            "    {}",
                            theme.dim.apply_to(ee.system_packages.join(", "))
                        ));
                    }
                }
            }
        }

        if ui.output_mode().shows_detail() {
            for (index, profile) in report.platform.profiles.iter().enumerate() {
                ui.show_header(&format!("Platform profile {}", index + 1));
                for (key, value) in profile {
                    ui.message(&format!("  {} = {}", theme.key.apply_to(key), value));
                }
            }
        }

        Ok(CommandResult::success())
    }
}
