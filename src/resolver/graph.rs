//! Wiring graph between resolved modules.

use std::collections::{BTreeMap, BTreeSet};

use super::{Provider, Wire};
use crate::module::ModuleId;

/// Represents the requirer/provider relationships of a resolution.
#[derive(Debug, Clone, Default)]
pub struct WiringGraph {
    /// Map of module to the modules it is wired to.
    dependencies: BTreeMap<ModuleId, BTreeSet<ModuleId>>,
    /// Map of module to the modules wired to it.
    dependents: BTreeMap<ModuleId, BTreeSet<ModuleId>>,
}

impl WiringGraph {
    /// Build the graph from module-to-module wires. Platform wires and
    /// self wires carry no dependency.
    pub fn from_wires(wires: &[Wire]) -> Self {
        let mut graph = Self::default();
        for wire in wires {
            if let Provider::Module(provider) = wire.provider {
                if provider != wire.requirer {
                    graph.add_edge(wire.requirer, provider);
                }
            }
        }
        graph
    }

    fn add_edge(&mut self, requirer: ModuleId, provider: ModuleId) {
        self.dependencies
            .entry(requirer)
            .or_default()
            .insert(provider);
        self.dependents
            .entry(provider)
            .or_default()
            .insert(requirer);
    }

    /// Get the providers a module is wired to.
    pub fn dependencies_of(&self, id: ModuleId) -> Option<&BTreeSet<ModuleId>> {
        self.dependencies.get(&id)
    }

    /// Get modules wired to the given module.
    pub fn dependents_of(&self, id: ModuleId) -> Option<&BTreeSet<ModuleId>> {
        self.dependents.get(&id)
    }

    /// Get all transitive dependents of a module.
    ///
    /// Returns modules wired to the given one, directly or indirectly.
    pub fn transitive_dependents(&self, id: ModuleId) -> BTreeSet<ModuleId> {
        let mut result = BTreeSet::new();
        let mut to_visit = vec![id];

        while let Some(current) = to_visit.pop() {
            if let Some(dependents) = self.dependents.get(&current) {
                for dep in dependents {
                    if result.insert(*dep) {
                        to_visit.push(*dep);
                    }
                }
            }
        }

        result.remove(&id);
        result
    }

    /// The seeds plus everything that transitively depends on them.
    pub fn invalidation_closure<I>(&self, seeds: I) -> BTreeSet<ModuleId>
    where
        I: IntoIterator<Item = ModuleId>,
    {
        let mut result = BTreeSet::new();
        for seed in seeds {
            result.insert(seed);
            result.extend(self.transitive_dependents(seed));
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}
