//! Command-line interface for modgraph.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, EnvironmentsArgs, ResolveArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
