//! modgraph - Incremental module dependency resolution.
//!
//! modgraph keeps the set of installed modules of a component platform,
//! their declared capabilities and requirements, and the execution
//! environments the platform can run. Changes are collected between
//! passes so each resolution can report exactly what was added, removed,
//! updated or changed status.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading and environment overrides
//! - [`environment`] - Execution environments and platform properties
//! - [`error`] - Error types and result aliases
//! - [`manifest`] - Manifest loading, environment injection and state hooks
//! - [`module`] - Module descriptors, versions, filters and capabilities
//! - [`resolver`] - Resolver seam, default resolver and resolution deltas
//! - [`state`] - The module graph state
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```
//! use modgraph::module::Headers;
//! use modgraph::state::ModuleGraphState;
//! use std::path::Path;
//!
//! let state = ModuleGraphState::builder().environments(["JavaSE-17"]).build();
//! let headers: Headers = [("Bundle-SymbolicName", "org.example")].into_iter().collect();
//! let module = state
//!     .install_headers(Path::new("/modules/example"), headers, None)
//!     .unwrap()
//!     .unwrap();
//!
//! let delta = state.resolve(false).unwrap();
//! assert!(delta.mentions(module.id()));
//! assert!(state.is_resolved(module.id()));
//! ```

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod manifest;
pub mod module;
pub mod resolver;
pub mod state;
pub mod ui;

pub use error::{ModGraphError, Result};
