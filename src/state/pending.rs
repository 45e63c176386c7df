//! Changes accumulated between resolution passes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::module::{ModuleDescriptor, ModuleId};

/// Graph edits since the last successful resolve.
#[derive(Debug, Clone, Default)]
pub struct PendingChanges {
    pub added: BTreeSet<ModuleId>,
    /// Removed descriptors, kept so the delta can still name them.
    pub removed: BTreeMap<ModuleId, Arc<ModuleDescriptor>>,
    pub updated: BTreeSet<ModuleId>,
}

impl PendingChanges {
    pub fn record_add(&mut self, id: ModuleId) {
        // Re-adding a module removed in the same pass is a replacement.
        if self.removed.remove(&id).is_some() {
            self.updated.insert(id);
        } else {
            self.added.insert(id);
        }
    }

    pub fn record_update(&mut self, id: ModuleId) {
        if !self.added.contains(&id) {
            self.updated.insert(id);
        }
    }

    pub fn record_remove(&mut self, descriptor: Arc<ModuleDescriptor>) {
        let id = descriptor.id();
        self.added.remove(&id);
        self.updated.remove(&id);
        self.removed.insert(id, descriptor);
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}
