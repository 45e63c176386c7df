//! Manifest loading and rewriting.
//!
//! The graph state never reads manifest text itself. It asks a
//! [`ManifestLoader`] for headers, may inject a required execution
//! environment for development projects, and lets a [`ManifestWeaver`]
//! rewrite the result before the descriptor is built.
//!
//! - [`parse`] - `MANIFEST.MF` text parsing
//! - [`loader`] - Filesystem and in-memory loaders
//! - [`inject`] - Execution environment injection rules
//! - [`hooks`] - Weaving and auxiliary-data strategies

pub mod hooks;
pub mod inject;
pub mod loader;
pub mod parse;

pub use hooks::{
    AuxiliaryData, DevClasspathWeaver, HeaderIndex, ManifestWeaver, NoAuxiliaryData, NoWeaving,
    StateHooks, StateHooksBuilder,
};
pub use inject::{
    compatible_environment, has_declared_required_environment, inject_required_environment,
    ManifestSource,
};
pub use loader::{FsManifestLoader, ManifestLoader, MemoryManifestLoader, MANIFEST_PATH};
pub use parse::parse_manifest;
