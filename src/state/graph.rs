//! The lock-guarded module graph.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use super::model::ModuleModel;
use super::pending::PendingChanges;
use crate::environment::{
    ExecutionEnvironment, ExecutionEnvironmentRegistry, PlatformInfo, PlatformProperties,
    ProfileSource, StaticProfiles,
};
use crate::error::{ModGraphError, Result};
use crate::manifest::{inject_required_environment, ManifestSource, StateHooks};
use crate::module::{Headers, ModuleDescriptor, ModuleId, Requirement};
use crate::resolver::delta::DeltaInput;
use crate::resolver::{
    unsatisfied, CapabilityResolver, Provider, ResolutionDelta, ResolveRequest, ResolveScope,
    Resolver, Wire, WiringGraph,
};

/// Symbolic name of the foundational module until one is installed.
pub const DEFAULT_SYSTEM_MODULE: &str = "org.eclipse.osgi";

/// Everything guarded by the graph lock.
#[derive(Debug, Clone)]
struct GraphInner {
    modules: BTreeMap<ModuleId, Arc<ModuleDescriptor>>,
    next_id: u64,
    system_module_name: String,
    registry: ExecutionEnvironmentRegistry,
    platform_info: PlatformInfo,
    /// Platform properties of the last successful pass.
    platform: PlatformProperties,
    resolved: BTreeSet<ModuleId>,
    wires: Vec<Wire>,
    pending: PendingChanges,
}

impl GraphInner {
    fn insert(&mut self, descriptor: Arc<ModuleDescriptor>) {
        let id = descriptor.id();
        if descriptor.is_system_module() {
            tracing::debug!(module = %descriptor.symbolic_name(), "system module installed");
            self.system_module_name = descriptor.symbolic_name().to_string();
            self.registry.mark_changed();
        }
        match self.modules.insert(id, Arc::clone(&descriptor)) {
            None => self.pending.record_add(id),
            Some(previous) if previous.same_content(&descriptor) => {}
            Some(_) => self.pending.record_update(id),
        }
        tracing::debug!(module = %descriptor, location = %descriptor.location().display(), "installed module");
    }

    fn remove(&mut self, id: ModuleId, hooks: &StateHooks) -> Option<Arc<ModuleDescriptor>> {
        let removed = self.modules.remove(&id)?;
        self.resolved.remove(&id);
        self.pending.record_remove(Arc::clone(&removed));
        hooks.auxiliary.discard(id);
        tracing::debug!(module = %removed, "removed module");
        Some(removed)
    }

    /// Committed wires, minus those touching a module removed since. The
    /// raw list still feeds the next pass's invalidation.
    fn live_wires(&self) -> Vec<Wire> {
        self.wires
            .iter()
            .filter(|w| self.modules.contains_key(&w.requirer))
            .filter(|w| match w.provider {
                Provider::Module(provider) => self.modules.contains_key(&provider),
                Provider::Platform => true,
            })
            .cloned()
            .collect()
    }

    fn ensure_environments(&mut self) {
        if self.registry.needs_refresh() {
            self.registry.refresh();
        }
    }
}

/// Incremental module-dependency resolution state.
///
/// All mutations and resolution passes are serialized by one lock. Manifest
/// loading happens before the lock is taken.
pub struct ModuleGraphState {
    inner: Mutex<GraphInner>,
    resolver: Arc<dyn Resolver>,
    hooks: StateHooks,
    development_mode: bool,
}

impl fmt::Debug for ModuleGraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleGraphState")
            .field("inner", &*self.inner.lock())
            .field("development_mode", &self.development_mode)
            .finish_non_exhaustive()
    }
}

impl Default for ModuleGraphState {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn read_error(location: &Path, err: ModGraphError) -> ModGraphError {
    match err {
        err @ ModGraphError::ManifestRead { .. } => err,
        other => ModGraphError::ManifestRead {
            location: location.to_path_buf(),
            message: other.to_string(),
        },
    }
}

impl ModuleGraphState {
    pub fn builder() -> ModuleGraphStateBuilder {
        ModuleGraphStateBuilder::default()
    }

    pub fn is_development_mode(&self) -> bool {
        self.development_mode
    }

    /// Load the manifest at `location` and install it.
    ///
    /// With `existing_id` the entry is updated in place. Returns `Ok(None)`
    /// when the location holds no module; in that case, and on a read
    /// error, the stale entry for `existing_id` is removed.
    pub fn add_or_update(
        &self,
        location: &Path,
        source: &ManifestSource,
        existing_id: Option<ModuleId>,
    ) -> Result<Option<Arc<ModuleDescriptor>>> {
        let mut headers = match self.hooks.loader.load(location) {
            Ok(Some(headers)) => headers,
            Ok(None) => {
                tracing::debug!(location = %location.display(), "no manifest");
                if let Some(id) = existing_id {
                    self.inner.lock().remove(id, &self.hooks);
                }
                return Ok(None);
            }
            Err(err) => {
                if let Some(id) = existing_id {
                    self.inner.lock().remove(id, &self.hooks);
                }
                return Err(read_error(location, err));
            }
        };

        if let Some(runtime) = source.runtime().filter(|_| self.development_mode) {
            let known = {
                let mut inner = self.inner.lock();
                inner.ensure_environments();
                inner.registry.known().map(<[_]>::to_vec).unwrap_or_default()
            };
            if let Some(id) = inject_required_environment(&mut headers, runtime, &known) {
                tracing::debug!(
                    location = %location.display(),
                    environment = %id,
                    "injected required execution environment"
                );
            }
        }

        self.hooks.weaver.weave(&mut headers, location);

        let mut inner = self.inner.lock();
        self.install(&mut inner, location, headers, existing_id)
    }

    /// Install already-parsed headers. Weaving applies; injection does not.
    pub fn install_headers(
        &self,
        location: &Path,
        mut headers: Headers,
        existing_id: Option<ModuleId>,
    ) -> Result<Option<Arc<ModuleDescriptor>>> {
        self.hooks.weaver.weave(&mut headers, location);
        let mut inner = self.inner.lock();
        self.install(&mut inner, location, headers, existing_id)
    }

    fn install(
        &self,
        inner: &mut GraphInner,
        location: &Path,
        headers: Headers,
        existing_id: Option<ModuleId>,
    ) -> Result<Option<Arc<ModuleDescriptor>>> {
        // The counter only advances once the descriptor is known to be valid.
        let id = existing_id.unwrap_or(ModuleId(inner.next_id + 1));
        let descriptor = match ModuleDescriptor::from_headers(id, location, headers) {
            Ok(descriptor) => Arc::new(descriptor),
            Err(ModGraphError::ManifestInvalid { message, .. }) => {
                tracing::debug!(location = %location.display(), reason = %message, "not a module");
                if let Some(id) = existing_id {
                    inner.remove(id, &self.hooks);
                }
                return Ok(None);
            }
            Err(err) => {
                if let Some(id) = existing_id {
                    inner.remove(id, &self.hooks);
                }
                return Err(read_error(location, err));
            }
        };

        match existing_id {
            None => inner.next_id += 1,
            Some(id) if !inner.modules.contains_key(&id) => {
                tracing::warn!(
                    id = %id,
                    location = %location.display(),
                    "update targets an unknown module id; inserting as new"
                );
                inner.next_id = inner.next_id.max(id.0);
            }
            Some(_) => {}
        }

        inner.insert(Arc::clone(&descriptor));
        self.hooks
            .auxiliary
            .record(&descriptor, descriptor.headers());
        Ok(Some(descriptor))
    }

    /// Install or update the module behind a caller handle.
    ///
    /// The handle's association follows the outcome: it points at the new
    /// entry on success and is cleared when the location is no longer a
    /// module or its manifest cannot be read.
    pub fn add_model(&self, model: &mut ModuleModel, update: bool) -> Option<Arc<ModuleDescriptor>> {
        let existing = if update { model.descriptor() } else { None };
        match self.add_or_update(model.location(), model.source(), existing) {
            Ok(descriptor) => {
                model.associate(descriptor.as_ref().map(|d| d.id()));
                descriptor
            }
            Err(err) => {
                tracing::warn!(location = %model.location().display(), error = %err, "could not load module");
                model.associate(None);
                None
            }
        }
    }

    /// Insert a pre-built descriptor under its own id, replacing any entry
    /// with that id.
    pub fn add_descriptor(&self, descriptor: ModuleDescriptor) -> Arc<ModuleDescriptor> {
        let descriptor = Arc::new(descriptor);
        let mut inner = self.inner.lock();
        inner.next_id = inner.next_id.max(descriptor.id().0);
        inner.insert(Arc::clone(&descriptor));
        self.hooks
            .auxiliary
            .record(&descriptor, descriptor.headers());
        descriptor
    }

    /// Replace the entry with the descriptor's id. Returns false when there
    /// is no such entry.
    pub fn update_descriptor(&self, descriptor: ModuleDescriptor) -> bool {
        let mut inner = self.inner.lock();
        if !inner.modules.contains_key(&descriptor.id()) {
            return false;
        }
        let descriptor = Arc::new(descriptor);
        inner.insert(Arc::clone(&descriptor));
        self.hooks
            .auxiliary
            .record(&descriptor, descriptor.headers());
        true
    }

    pub fn remove_descriptor(&self, descriptor: &ModuleDescriptor) -> bool {
        self.remove(descriptor.id()).is_some()
    }

    /// Remove a module. Unknown ids are ignored.
    pub fn remove(&self, id: ModuleId) -> Option<Arc<ModuleDescriptor>> {
        self.inner.lock().remove(id, &self.hooks)
    }

    /// Run a resolution pass.
    ///
    /// A changed environment set forces a full pass whatever `incremental`
    /// says.
    pub fn resolve(&self, incremental: bool) -> Result<ResolutionDelta> {
        let scope = if incremental {
            ResolveScope::Incremental
        } else {
            ResolveScope::Full
        };
        let mut inner = self.inner.lock();
        self.run(&mut inner, scope)
    }

    /// Resolve the named modules, their dependents and the providers they
    /// reach.
    pub fn resolve_subset(&self, names: &[&str]) -> Result<ResolutionDelta> {
        let mut inner = self.inner.lock();
        let seeds: BTreeSet<ModuleId> = inner
            .modules
            .values()
            .filter(|m| names.contains(&m.symbolic_name()))
            .map(|m| m.id())
            .collect();
        self.run(&mut inner, ResolveScope::Subset(seeds))
    }

    fn run(&self, inner: &mut GraphInner, requested: ResolveScope) -> Result<ResolutionDelta> {
        inner.ensure_environments();

        let refreshed = inner.registry.is_changed().then(|| {
            inner
                .registry
                .platform_properties(&inner.platform_info, &inner.system_module_name)
        });
        let scope = if refreshed.is_some() {
            ResolveScope::Full
        } else {
            requested
        };
        tracing::debug!(scope = %scope, modules = inner.modules.len(), "resolve");

        let platform = refreshed.as_ref().unwrap_or(&inner.platform);
        let removed: BTreeSet<ModuleId> = inner.pending.removed.keys().copied().collect();
        let request = ResolveRequest {
            modules: &inner.modules,
            platform,
            resolved: &inner.resolved,
            wires: &inner.wires,
            updated: &inner.pending.updated,
            removed: &removed,
            scope,
        };
        let resolution = self.resolver.resolve(&request)?;

        if let Some(unknown) = resolution
            .resolved
            .iter()
            .copied()
            .chain(resolution.wires.iter().flat_map(|w| match w.provider {
                Provider::Module(provider) => vec![w.requirer, provider],
                Provider::Platform => vec![w.requirer],
            }))
            .find(|id| !inner.modules.contains_key(id))
        {
            return Err(ModGraphError::ResolverFailed {
                message: format!("resolution references unknown module {}", unknown),
            });
        }

        let delta = ResolutionDelta::compute(DeltaInput {
            modules: &inner.modules,
            added: &inner.pending.added,
            removed: &inner.pending.removed,
            updated: &inner.pending.updated,
            before: &inner.resolved,
            after: &resolution.resolved,
        });

        if let Some(platform) = refreshed {
            tracing::debug!(profiles = platform.profiles.len(), "pushed platform properties");
            inner.platform = platform;
            inner.registry.clear_changed();
        }
        inner.resolved = resolution.resolved;
        inner.wires = resolution.wires;
        inner.pending = PendingChanges::default();

        tracing::info!(
            added = delta.added.len(),
            removed = delta.removed.len(),
            updated = delta.updated.len(),
            changed = delta.changed.len(),
            resolved = inner.resolved.len(),
            "resolution complete"
        );
        Ok(delta)
    }

    /// Allocate the next module id.
    pub fn next_id(&self) -> ModuleId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        ModuleId(inner.next_id)
    }

    /// Recompute the known execution environments.
    pub fn refresh_environments(&self) {
        self.inner.lock().registry.refresh();
    }

    /// An independent copy sharing the resolver and hooks.
    pub fn fork(&self) -> Self {
        Self {
            inner: Mutex::new(self.inner.lock().clone()),
            resolver: Arc::clone(&self.resolver),
            hooks: self.hooks.clone(),
            development_mode: self.development_mode,
        }
    }

    pub fn descriptor(&self, id: ModuleId) -> Option<Arc<ModuleDescriptor>> {
        self.inner.lock().modules.get(&id).cloned()
    }

    /// All descriptors in id order.
    pub fn descriptors(&self) -> Vec<Arc<ModuleDescriptor>> {
        self.inner.lock().modules.values().cloned().collect()
    }

    pub fn descriptors_named(&self, name: &str) -> Vec<Arc<ModuleDescriptor>> {
        self.inner
            .lock()
            .modules
            .values()
            .filter(|m| m.symbolic_name() == name)
            .cloned()
            .collect()
    }

    /// Whether the last pass resolved `id` and it has not changed since.
    pub fn is_resolved(&self, id: ModuleId) -> bool {
        let inner = self.inner.lock();
        inner.modules.contains_key(&id)
            && inner.resolved.contains(&id)
            && !inner.pending.updated.contains(&id)
    }

    /// Installed modules for which [`is_resolved`](Self::is_resolved) is false.
    pub fn unresolved(&self) -> Vec<Arc<ModuleDescriptor>> {
        let inner = self.inner.lock();
        inner
            .modules
            .values()
            .filter(|m| {
                !inner.resolved.contains(&m.id()) || inner.pending.updated.contains(&m.id())
            })
            .cloned()
            .collect()
    }

    /// Mandatory requirements of `id` that neither a resolved module nor
    /// the platform of the last pass satisfies.
    pub fn unsatisfied_requirements(&self, id: ModuleId) -> Vec<Requirement> {
        let inner = self.inner.lock();
        let Some(module) = inner.modules.get(&id) else {
            return Vec::new();
        };
        let providers: Vec<&ModuleDescriptor> = inner
            .resolved
            .iter()
            .filter(|p| **p != id)
            .filter_map(|p| inner.modules.get(p))
            .map(|m| m.as_ref())
            .collect();
        unsatisfied(module, &providers, &inner.platform)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Committed wires between modules still installed.
    pub fn wires(&self) -> Vec<Wire> {
        self.inner.lock().live_wires()
    }

    /// Modules wired to `id`, directly or indirectly.
    pub fn dependents_of(&self, id: ModuleId) -> BTreeSet<ModuleId> {
        WiringGraph::from_wires(&self.inner.lock().live_wires()).transitive_dependents(id)
    }

    /// Symbolic name of the foundational module.
    pub fn system_module(&self) -> String {
        self.inner.lock().system_module_name.clone()
    }

    /// Known environments, computing them on first use. `None` in
    /// no-profile mode.
    pub fn known_environments(&self) -> Option<Vec<ExecutionEnvironment>> {
        let mut inner = self.inner.lock();
        inner.ensure_environments();
        inner.registry.known().map(<[_]>::to_vec)
    }

    /// Whether the next pass will recompute platform properties.
    pub fn environments_changed(&self) -> bool {
        let inner = self.inner.lock();
        inner.registry.is_changed() || inner.registry.needs_refresh()
    }

    /// Platform properties of the last successful pass.
    pub fn platform_properties(&self) -> PlatformProperties {
        self.inner.lock().platform.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().modules.is_empty()
    }
}

/// Builder for [`ModuleGraphState`].
pub struct ModuleGraphStateBuilder {
    profiles: Arc<dyn ProfileSource>,
    jre_profile: Option<String>,
    platform: PlatformInfo,
    system_module: String,
    resolver: Arc<dyn Resolver>,
    hooks: StateHooks,
    development_mode: bool,
}

impl Default for ModuleGraphStateBuilder {
    fn default() -> Self {
        Self {
            profiles: Arc::new(StaticProfiles::default()),
            jre_profile: None,
            platform: PlatformInfo::default(),
            system_module: DEFAULT_SYSTEM_MODULE.to_string(),
            resolver: Arc::new(CapabilityResolver::new()),
            hooks: StateHooks::default(),
            development_mode: false,
        }
    }
}

impl ModuleGraphStateBuilder {
    pub fn profiles(mut self, profiles: Arc<dyn ProfileSource>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Profiles given by id, in preference order.
    pub fn environments<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles(Arc::new(StaticProfiles::from_ids(ids)))
    }

    pub fn jre_profile(mut self, jre_profile: Option<String>) -> Self {
        self.jre_profile = jre_profile;
        self
    }

    pub fn platform(mut self, platform: PlatformInfo) -> Self {
        self.platform = platform;
        self
    }

    pub fn system_module(mut self, name: impl Into<String>) -> Self {
        self.system_module = name.into();
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn hooks(mut self, hooks: StateHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }

    pub fn build(self) -> ModuleGraphState {
        let registry =
            ExecutionEnvironmentRegistry::new(self.profiles).with_jre_profile(self.jre_profile);
        ModuleGraphState {
            inner: Mutex::new(GraphInner {
                modules: BTreeMap::new(),
                next_id: 0,
                system_module_name: self.system_module,
                registry,
                platform_info: self.platform,
                platform: PlatformProperties::default(),
                resolved: BTreeSet::new(),
                wires: Vec::new(),
                pending: PendingChanges::default(),
            }),
            resolver: self.resolver,
            hooks: self.hooks,
            development_mode: self.development_mode,
        }
    }
}
