//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands are
//! routed by [`CommandDispatcher`], which also loads the configuration
//! they share.

pub mod dispatcher;
pub mod environments;
pub mod resolve;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
