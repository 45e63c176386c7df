//! Manifest loading.
//!
//! A [`ManifestLoader`] turns a module location into its header map. The
//! filesystem loader reads `META-INF/MANIFEST.MF` below a module directory;
//! the in-memory loader serves tests and embedders that already hold parsed
//! headers.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::parse::parse_manifest;
use crate::error::{ModGraphError, Result};
use crate::module::Headers;

/// Relative path of the manifest inside a module directory.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Loads module manifests.
pub trait ManifestLoader: Send + Sync {
    /// Headers for the module at `location`.
    ///
    /// `Ok(None)` means the location holds no manifest and is not a module.
    fn load(&self, location: &Path) -> Result<Option<Headers>>;
}

/// Reads manifests from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsManifestLoader;

impl FsManifestLoader {
    /// The manifest file for a location: the location itself when it is a
    /// file, otherwise `META-INF/MANIFEST.MF` below it.
    pub fn manifest_file(location: &Path) -> PathBuf {
        if location.is_file() {
            location.to_path_buf()
        } else {
            location.join(MANIFEST_PATH)
        }
    }
}

impl ManifestLoader for FsManifestLoader {
    fn load(&self, location: &Path) -> Result<Option<Headers>> {
        let file = Self::manifest_file(location);
        let text = match fs::read_to_string(&file) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ModGraphError::ManifestRead {
                    location: location.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        parse_manifest(&text)
            .map(Some)
            .map_err(|message| ModGraphError::ManifestRead {
                location: location.to_path_buf(),
                message,
            })
    }
}

/// Serves manifests from memory, keyed by location.
#[derive(Debug, Default)]
pub struct MemoryManifestLoader {
    manifests: RwLock<HashMap<PathBuf, Headers>>,
}

impl MemoryManifestLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the manifest for `location`.
    pub fn insert(&self, location: impl Into<PathBuf>, headers: Headers) {
        self.manifests.write().insert(location.into(), headers);
    }

    /// Forget the manifest for `location`.
    pub fn remove(&self, location: &Path) -> Option<Headers> {
        self.manifests.write().remove(location)
    }
}

impl ManifestLoader for MemoryManifestLoader {
    fn load(&self, location: &Path) -> Result<Option<Headers>> {
        Ok(self.manifests.read().get(location).cloned())
    }
}
