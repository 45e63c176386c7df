//! Caller-side handle to an installed module.

use std::path::{Path, PathBuf};

use crate::manifest::ManifestSource;
use crate::module::ModuleId;

/// A module as the surrounding system tracks it: where it lives, where its
/// manifest comes from, and which graph entry currently represents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleModel {
    location: PathBuf,
    source: ManifestSource,
    descriptor: Option<ModuleId>,
}

impl ModuleModel {
    pub fn new(location: impl Into<PathBuf>, source: ManifestSource) -> Self {
        Self {
            location: location.into(),
            source,
            descriptor: None,
        }
    }

    /// A packaged module at `location`.
    pub fn packaged(location: impl Into<PathBuf>) -> Self {
        Self::new(location, ManifestSource::Packaged)
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn source(&self) -> &ManifestSource {
        &self.source
    }

    /// Graph entry currently associated with this model.
    pub fn descriptor(&self) -> Option<ModuleId> {
        self.descriptor
    }

    pub(crate) fn associate(&mut self, id: Option<ModuleId>) {
        self.descriptor = id;
    }
}
