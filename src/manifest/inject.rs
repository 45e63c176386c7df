//! Required execution environment injection for development projects.
//!
//! A module under active development that declares no execution environment
//! would otherwise resolve its imports against every known profile. When
//! the project's runtime is known, the first strictly compatible
//! environment (in registry order) is written into the manifest instead.

use crate::environment::{ExecutionEnvironment, ProjectRuntime};
use crate::module::{names, namespace, parse_clauses, Headers};

/// Where a manifest comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ManifestSource {
    /// A packaged artifact. Its manifest is used as is.
    #[default]
    Packaged,
    /// A project under development, with the runtime it builds against
    /// when one is configured.
    Project { runtime: Option<ProjectRuntime> },
}

impl ManifestSource {
    /// Development project building against `runtime`.
    pub fn project(runtime: ProjectRuntime) -> Self {
        ManifestSource::Project {
            runtime: Some(runtime),
        }
    }

    pub fn runtime(&self) -> Option<&ProjectRuntime> {
        match self {
            ManifestSource::Project { runtime } => runtime.as_ref(),
            ManifestSource::Packaged => None,
        }
    }
}

/// Whether the manifest declares an execution environment in any form:
/// the legacy header or an `osgi.ee` capability requirement.
pub fn has_declared_required_environment(headers: &Headers) -> bool {
    if headers.contains_key(names::REQUIRED_EXECUTION_ENVIRONMENT) {
        return true;
    }
    let Some(value) = headers.get(names::REQUIRE_CAPABILITY) else {
        return false;
    };
    // An unparseable header counts as no declaration.
    parse_clauses(names::REQUIRE_CAPABILITY, value)
        .map(|clauses| {
            clauses
                .iter()
                .flat_map(|c| c.values.iter())
                .any(|ns| ns == namespace::EXECUTION_ENVIRONMENT)
        })
        .unwrap_or(false)
}

/// First environment, in the given order, strictly compatible with `runtime`.
pub fn compatible_environment<'a>(
    known: &'a [ExecutionEnvironment],
    runtime: &ProjectRuntime,
) -> Option<&'a ExecutionEnvironment> {
    known.iter().find(|ee| ee.is_strictly_compatible(runtime))
}

/// Inject a required execution environment when none is declared.
///
/// Returns the injected id. Declared environments are never overridden, and
/// a missing match leaves the headers unchanged.
pub fn inject_required_environment(
    headers: &mut Headers,
    runtime: &ProjectRuntime,
    known: &[ExecutionEnvironment],
) -> Option<String> {
    if has_declared_required_environment(headers) {
        return None;
    }
    let ee = compatible_environment(known, runtime)?;
    headers.insert(names::REQUIRED_EXECUTION_ENVIRONMENT, ee.id.clone());
    Some(ee.id.clone())
}
