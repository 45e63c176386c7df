//! Module graph state.
//!
//! [`ModuleGraphState`] owns the installed descriptors, the execution
//! environment registry and the last committed resolution. Every mutation
//! and resolution pass runs under one lock.

pub mod graph;
pub mod model;
pub mod pending;

pub use graph::{ModuleGraphState, ModuleGraphStateBuilder, DEFAULT_SYSTEM_MODULE};
pub use model::ModuleModel;
pub use pending::PendingChanges;
