//! Default capability-matching resolver.
//!
//! Resolution is the greatest set of modules whose mandatory requirements
//! are all met by modules in that same set or by the platform. It is found
//! by repeatedly discarding candidates with an unmet requirement until
//! nothing changes. Singleton conflicts are settled up front.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{Provider, Resolution, ResolveRequest, ResolveScope, Resolver, Wire, WiringGraph};
use crate::environment::{keys, PlatformProperties};
use crate::error::Result;
use crate::module::{
    namespace, AttrValue, Capability, ModuleDescriptor, ModuleId, Requirement, Version,
};

/// Capabilities one platform profile offers.
struct ProfileView {
    capabilities: Vec<Capability>,
}

/// The platform as seen by requirement matching.
struct PlatformView {
    enforce_environments: bool,
    profiles: Vec<ProfileView>,
}

impl PlatformView {
    fn new(platform: &PlatformProperties) -> Self {
        let profiles = platform
            .profile_capabilities()
            .into_iter()
            .zip(&platform.profiles)
            .map(|(decoded, map)| {
                let system = map
                    .get(keys::SYSTEM_BUNDLE)
                    .cloned()
                    .unwrap_or_default();
                let mut capabilities = decoded.capabilities;
                capabilities.extend(decoded.system_packages.into_iter().map(|package| {
                    Capability::new(namespace::PACKAGE)
                        .with(namespace::PACKAGE, AttrValue::String(package))
                        .with("version", AttrValue::Version(Version::empty()))
                        .with("bundle-symbolic-name", AttrValue::String(system.clone()))
                }));
                ProfileView { capabilities }
            })
            .collect();
        Self {
            enforce_environments: platform.enforce_environments,
            profiles,
        }
    }

    fn environment_requirements(module: &ModuleDescriptor) -> impl Iterator<Item = &Requirement> {
        module
            .requirements()
            .iter()
            .filter(|r| r.namespace == namespace::EXECUTION_ENVIRONMENT)
    }

    /// Profiles whose environment `module` can run on.
    fn eligible(&self, module: &ModuleDescriptor) -> Vec<&ProfileView> {
        let environment: Vec<&Requirement> = Self::environment_requirements(module).collect();
        if !self.enforce_environments || environment.is_empty() {
            return self.profiles.iter().collect();
        }
        self.profiles
            .iter()
            .filter(|profile| {
                environment
                    .iter()
                    .all(|req| profile.capabilities.iter().any(|c| req.is_satisfied_by(c)))
            })
            .collect()
    }

    fn satisfies(&self, module: &ModuleDescriptor, requirement: &Requirement) -> bool {
        if requirement.namespace == namespace::EXECUTION_ENVIRONMENT && !self.enforce_environments
        {
            return true;
        }
        self.eligible(module).iter().any(|profile| {
            profile
                .capabilities
                .iter()
                .any(|c| requirement.is_satisfied_by(c))
        })
    }
}

/// Greatest-fixed-point capability matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityResolver;

impl CapabilityResolver {
    pub fn new() -> Self {
        Self
    }
}

/// Live modules able to satisfy `requirement`, best first: kept providers,
/// then the highest version, then the lowest id.
fn providers<'a>(
    requirement: &Requirement,
    live: &BTreeSet<ModuleId>,
    keep: &BTreeSet<ModuleId>,
    modules: &'a BTreeMap<ModuleId, Arc<ModuleDescriptor>>,
) -> Vec<&'a Arc<ModuleDescriptor>> {
    let mut found: Vec<&Arc<ModuleDescriptor>> = live
        .iter()
        .filter_map(|id| modules.get(id))
        .filter(|m| m.capabilities().iter().any(|c| requirement.is_satisfied_by(c)))
        .collect();
    found.sort_by_key(|m| (!keep.contains(&m.id()), Reverse(m.version().clone()), m.id()));
    found
}

/// Ids of every module able to satisfy some requirement of `from`,
/// transitively.
fn reachable_providers(
    from: &BTreeSet<ModuleId>,
    modules: &BTreeMap<ModuleId, Arc<ModuleDescriptor>>,
) -> BTreeSet<ModuleId> {
    let mut seen = from.clone();
    let mut to_visit: Vec<ModuleId> = from.iter().copied().collect();
    while let Some(current) = to_visit.pop() {
        let Some(module) = modules.get(&current) else {
            continue;
        };
        for requirement in module.requirements() {
            for (id, candidate) in modules {
                if !seen.contains(id)
                    && candidate
                        .capabilities()
                        .iter()
                        .any(|c| requirement.is_satisfied_by(c))
                {
                    seen.insert(*id);
                    to_visit.push(*id);
                }
            }
        }
    }
    seen
}

/// Split the modules into kept resolutions and candidates to evaluate.
fn partition(request: &ResolveRequest<'_>) -> (BTreeSet<ModuleId>, BTreeSet<ModuleId>) {
    let present: BTreeSet<ModuleId> = request.modules.keys().copied().collect();
    let graph = WiringGraph::from_wires(request.wires);
    let dirty = request.updated.iter().chain(request.removed).copied();

    match &request.scope {
        ResolveScope::Full => (BTreeSet::new(), present),
        ResolveScope::Incremental => {
            let invalid = graph.invalidation_closure(dirty);
            let keep: BTreeSet<ModuleId> = request
                .resolved
                .iter()
                .filter(|id| present.contains(id) && !invalid.contains(id))
                .copied()
                .collect();
            let candidates = present.difference(&keep).copied().collect();
            (keep, candidates)
        }
        ResolveScope::Subset(seeds) => {
            let invalid = graph.invalidation_closure(seeds.iter().copied().chain(dirty));
            let keep: BTreeSet<ModuleId> = request
                .resolved
                .iter()
                .filter(|id| present.contains(id) && !invalid.contains(id))
                .copied()
                .collect();
            let start: BTreeSet<ModuleId> = invalid.intersection(&present).copied().collect();
            let candidates = reachable_providers(&start, request.modules)
                .into_iter()
                .filter(|id| !keep.contains(id))
                .collect();
            (keep, candidates)
        }
    }
}

/// Drop candidate singletons that lose to another module of the same name.
fn settle_singletons(
    keep: &BTreeSet<ModuleId>,
    candidates: &mut BTreeSet<ModuleId>,
    modules: &BTreeMap<ModuleId, Arc<ModuleDescriptor>>,
) {
    let mut by_name: BTreeMap<&str, Vec<&Arc<ModuleDescriptor>>> = BTreeMap::new();
    for id in keep.iter().chain(candidates.iter()) {
        if let Some(module) = modules.get(id).filter(|m| m.is_singleton()) {
            by_name.entry(module.symbolic_name()).or_default().push(module);
        }
    }
    for (name, mut group) in by_name {
        if group.len() < 2 {
            continue;
        }
        group.sort_by_key(|m| (!keep.contains(&m.id()), Reverse(m.version().clone()), m.id()));
        let winner = group[0].id();
        for loser in &group[1..] {
            if candidates.remove(&loser.id()) {
                tracing::debug!(module = %name, winner = %winner, loser = %loser.id(), "singleton conflict");
            }
        }
    }
}

/// Mandatory requirements of `module` met neither by `providers` nor by
/// the platform.
pub fn unsatisfied<'a>(
    module: &'a ModuleDescriptor,
    providers: &[&ModuleDescriptor],
    platform: &PlatformProperties,
) -> Vec<&'a Requirement> {
    let view = PlatformView::new(platform);
    module
        .requirements()
        .iter()
        .filter(|req| !req.optional)
        .filter(|req| {
            !providers
                .iter()
                .any(|p| p.capabilities().iter().any(|c| req.is_satisfied_by(c)))
        })
        .filter(|req| !view.satisfies(module, req))
        .collect()
}

impl Resolver for CapabilityResolver {
    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Resolution> {
        let platform = PlatformView::new(request.platform);
        let (keep, mut candidates) = partition(request);
        settle_singletons(&keep, &mut candidates, request.modules);

        tracing::debug!(
            scope = %request.scope,
            kept = keep.len(),
            candidates = candidates.len(),
            "resolving"
        );

        let mut live: BTreeSet<ModuleId> = keep.union(&candidates).copied().collect();
        loop {
            let failing: Vec<ModuleId> = candidates
                .iter()
                .filter(|id| live.contains(id))
                .filter(|id| {
                    let Some(module) = request.modules.get(id) else {
                        return true;
                    };
                    module.requirements().iter().any(|req| {
                        !req.optional
                            && providers(req, &live, &keep, request.modules).is_empty()
                            && !platform.satisfies(module, req)
                    })
                })
                .copied()
                .collect();
            if failing.is_empty() {
                break;
            }
            for id in failing {
                live.remove(&id);
            }
        }

        // Previously resolved modules outside this pass stay resolved.
        let mut resolved = live;
        resolved.extend(
            request
                .resolved
                .iter()
                .filter(|id| request.modules.contains_key(id))
                .filter(|id| !keep.contains(id) && !candidates.contains(id))
                .filter(|id| {
                    !matches!(request.scope, ResolveScope::Full)
                        && !request.updated.contains(id)
                }),
        );

        let mut wires: Vec<Wire> = request
            .wires
            .iter()
            .filter(|w| resolved.contains(&w.requirer) && !candidates.contains(&w.requirer))
            .cloned()
            .collect();
        for id in candidates.iter().filter(|id| resolved.contains(id)) {
            let Some(module) = request.modules.get(id) else {
                continue;
            };
            for req in module.requirements() {
                let provider = match providers(req, &resolved, &keep, request.modules).first() {
                    Some(best) => Provider::Module(best.id()),
                    None if platform.satisfies(module, req) => Provider::Platform,
                    None => continue,
                };
                wires.push(Wire {
                    requirer: *id,
                    provider,
                    namespace: req.namespace.clone(),
                    requirement: req.to_string(),
                });
            }
        }
        wires.sort_by(|a, b| (a.requirer, a.provider).cmp(&(b.requirer, b.provider)));

        Ok(Resolution { resolved, wires })
    }
}
