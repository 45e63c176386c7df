//! Resolution deltas.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::module::{ModuleDescriptor, ModuleId, Version};

/// One module in a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeltaEntry {
    pub id: ModuleId,
    pub symbolic_name: String,
    pub version: Version,
    /// Resolution status after the pass.
    pub resolved: bool,
}

impl DeltaEntry {
    pub fn new(descriptor: &ModuleDescriptor, resolved: bool) -> Self {
        Self {
            id: descriptor.id(),
            symbolic_name: descriptor.symbolic_name().to_string(),
            version: descriptor.version().clone(),
            resolved,
        }
    }
}

/// Modules added, removed, replaced and changed by a resolution pass.
///
/// Every list is sorted by id. `changed` holds modules present before and
/// after the pass whose resolution status flipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionDelta {
    pub added: Vec<DeltaEntry>,
    pub removed: Vec<DeltaEntry>,
    pub updated: Vec<DeltaEntry>,
    pub changed: Vec<DeltaEntry>,
}

/// Pending graph changes a delta is computed from.
pub(crate) struct DeltaInput<'a> {
    pub modules: &'a BTreeMap<ModuleId, Arc<ModuleDescriptor>>,
    pub added: &'a BTreeSet<ModuleId>,
    pub removed: &'a BTreeMap<ModuleId, Arc<ModuleDescriptor>>,
    pub updated: &'a BTreeSet<ModuleId>,
    pub before: &'a BTreeSet<ModuleId>,
    pub after: &'a BTreeSet<ModuleId>,
}

impl ResolutionDelta {
    pub(crate) fn compute(input: DeltaInput<'_>) -> Self {
        let entry = |id: &ModuleId| {
            input
                .modules
                .get(id)
                .map(|d| DeltaEntry::new(d, input.after.contains(id)))
        };

        let added = input.added.iter().filter_map(entry).collect();
        let updated = input.updated.iter().filter_map(entry).collect();
        let removed = input
            .removed
            .values()
            .map(|d| DeltaEntry::new(d, false))
            .collect();
        let changed = input
            .modules
            .keys()
            .filter(|id| !input.added.contains(id))
            .filter(|id| input.before.contains(id) != input.after.contains(id))
            .filter_map(entry)
            .collect();

        Self {
            added,
            removed,
            updated,
            changed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.updated.is_empty()
            && self.changed.is_empty()
    }

    /// Whether `id` appears anywhere in the delta.
    pub fn mentions(&self, id: ModuleId) -> bool {
        [&self.added, &self.removed, &self.updated, &self.changed]
            .iter()
            .any(|list| list.iter().any(|e| e.id == id))
    }

    /// Ids of modules reported as resolved.
    pub fn resolved_ids(&self) -> BTreeSet<ModuleId> {
        [&self.added, &self.updated, &self.changed]
            .iter()
            .flat_map(|list| list.iter())
            .filter(|e| e.resolved)
            .map(|e| e.id)
            .collect()
    }
}
