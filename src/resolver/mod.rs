//! Resolver primitive and resolution results.
//!
//! The graph state hands a [`ResolveRequest`] (a stable snapshot of the
//! modules, the platform properties and the previous resolution) to a
//! [`Resolver`] and commits the returned [`Resolution`] only on success.
//!
//! - [`graph`] - Requirer/provider wiring graph used for invalidation
//! - [`matcher`] - The default [`CapabilityResolver`]
//! - [`delta`] - [`ResolutionDelta`] reported to callers

pub mod delta;
pub mod graph;
pub mod matcher;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::environment::PlatformProperties;
use crate::error::Result;
use crate::module::{ModuleDescriptor, ModuleId};

pub use delta::{DeltaEntry, ResolutionDelta};
pub use graph::WiringGraph;
pub use matcher::{unsatisfied, CapabilityResolver};

/// What a resolution pass re-evaluates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveScope {
    /// Discard the previous resolution and resolve everything.
    Full,
    /// Keep still-valid resolutions; resolve the rest.
    Incremental,
    /// Re-resolve the given modules, their dependents and the providers
    /// they can reach.
    Subset(BTreeSet<ModuleId>),
}

impl fmt::Display for ResolveScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveScope::Full => write!(f, "full"),
            ResolveScope::Incremental => write!(f, "incremental"),
            ResolveScope::Subset(ids) => write!(f, "subset of {}", ids.len()),
        }
    }
}

/// Who satisfies a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum Provider {
    Module(ModuleId),
    /// The platform itself (execution environment, system packages).
    Platform,
}

/// A requirement of one module bound to its provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wire {
    pub requirer: ModuleId,
    pub provider: Provider,
    pub namespace: String,
    /// The manifest clause of the requirement.
    pub requirement: String,
}

/// Input snapshot of one resolution pass.
#[derive(Debug)]
pub struct ResolveRequest<'a> {
    pub modules: &'a BTreeMap<ModuleId, Arc<ModuleDescriptor>>,
    pub platform: &'a PlatformProperties,
    /// Resolved set of the last committed pass.
    pub resolved: &'a BTreeSet<ModuleId>,
    /// Wires of the last committed pass.
    pub wires: &'a [Wire],
    /// Modules replaced since the last pass.
    pub updated: &'a BTreeSet<ModuleId>,
    /// Modules removed since the last pass.
    pub removed: &'a BTreeSet<ModuleId>,
    pub scope: ResolveScope,
}

/// Output of a successful pass: the complete new resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: BTreeSet<ModuleId>,
    pub wires: Vec<Wire>,
}

/// The resolver primitive.
///
/// Implementations must not assume anything beyond the request snapshot
/// and must return an error rather than a partial resolution.
pub trait Resolver: Send + Sync {
    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Resolution>;
}
