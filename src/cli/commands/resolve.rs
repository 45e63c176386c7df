//! Resolve command implementation.
//!
//! `modgraph resolve` installs module directories into a fresh graph,
//! runs a full resolution and reports which modules resolved. Modules
//! passed with `--dev` are treated as projects under development, so
//! the configured project runtime can supply their required environment.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::args::ResolveArgs;
use crate::config::ModGraphConfig;
use crate::error::{ModGraphError, Result};
use crate::manifest::ManifestSource;
use crate::module::{ModuleId, Version};
use crate::resolver::ResolutionDelta;
use crate::state::ModuleGraphState;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Outcome for one installed module.
#[derive(Debug, Serialize)]
struct ModuleStatus {
    id: ModuleId,
    symbolic_name: String,
    version: Version,
    location: PathBuf,
    resolved: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    required_environments: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ResolveReport {
    delta: ResolutionDelta,
    modules: Vec<ModuleStatus>,
}

/// The resolve command implementation.
pub struct ResolveCommand {
    project_root: PathBuf,
    config: ModGraphConfig,
    args: ResolveArgs,
}

impl ResolveCommand {
    pub fn new(project_root: &Path, config: ModGraphConfig, args: ResolveArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config,
            args,
        }
    }

    pub fn args(&self) -> &ResolveArgs {
        &self.args
    }

    /// Install every requested directory. Returns the number that failed
    /// to load.
    fn install_all(&self, state: &ModuleGraphState, ui: &mut dyn UserInterface) -> usize {
        let packaged = ManifestSource::Packaged;
        let project = self.config.project_source();
        let dirs = self
            .args
            .modules
            .iter()
            .map(|dir| (dir, &packaged))
            .chain(self.args.dev.iter().map(|dir| (dir, &project)));

        let mut failures = 0;
        for (dir, source) in dirs {
            let location = self.project_root.join(dir);
            match state.add_or_update(&location, source, None) {
                Ok(Some(descriptor)) => {
                    tracing::debug!(module = %descriptor, "installed");
                }
                Ok(None) => {
                    ui.warning(&format!("No module manifest in {}", dir.display()));
                }
                Err(err) => {
                    ui.error(&err.to_string());
                    failures += 1;
                }
            }
        }
        failures
    }

    fn report(state: &ModuleGraphState, delta: ResolutionDelta) -> ResolveReport {
        let modules = state
            .descriptors()
            .iter()
            .map(|m| {
                let resolved = state.is_resolved(m.id());
                let missing = if resolved {
                    Vec::new()
                } else {
                    state
                        .unsatisfied_requirements(m.id())
                        .iter()
                        .map(|req| format!("{} {}", req.namespace, req.source))
                        .collect()
                };
                ModuleStatus {
                    id: m.id(),
                    symbolic_name: m.symbolic_name().to_string(),
                    version: m.version().clone(),
                    location: m.location().to_path_buf(),
                    resolved,
                    required_environments: m.required_environments().to_vec(),
                    missing,
                }
            })
            .collect();
        ResolveReport { delta, modules }
    }

    fn show(&self, report: &ResolveReport, ui: &mut dyn UserInterface) {
        let theme = ui.theme();
        let verbose = ui.output_mode().shows_detail();

        ui.show_header("Modules");
        for module in &report.modules {
            let label = format!(
                "{} {}",
                theme.highlight.apply_to(&module.symbolic_name),
                module.version
            );
            if module.resolved {
                ui.success(&label);
            } else {
                ui.warning(&format!("{} unresolved", label));
                for missing in &module.missing {
                    ui.message(&format!("    missing {}", missing));
                }
            }
            if verbose {
                ui.message(&format!(
                    "    {}",
                    theme
                        .dim
                        .apply_to(format!("[{}] {}", module.id, module.location.display()))
                ));
            }
        }

        let resolved = report.modules.iter().filter(|m| m.resolved).count();
        ui.message("");
        ui.message(&format!(
            "{} of {} modules resolved",
            resolved,
            report.modules.len()
        ));
    }
}

impl Command for ResolveCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        if self.args.modules.is_empty() && self.args.dev.is_empty() {
            ui.error("No module directories given");
            return Ok(CommandResult::failure(2));
        }

        let state = self.config.build_state();
        let failures = self.install_all(&state, ui);
        let delta = state.resolve(false)?;
        let report = Self::report(&state, delta);

        if self.args.json {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| ModGraphError::Other(e.into()))?;
            ui.data(&json);
        } else {
            self.show(&report, ui);
        }

        if failures > 0 || report.modules.iter().any(|m| !m.resolved) {
            Ok(CommandResult::failure(1))
        } else {
            Ok(CommandResult::success())
        }
    }
}
