//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// modgraph - Incremental module dependency resolution.
#[derive(Debug, Parser)]
#[command(name = "modgraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides default .modgraph/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Show per-module detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install module directories and resolve them
    Resolve(ResolveArgs),

    /// Show known execution environments and platform properties
    Environments(EnvironmentsArgs),
}

/// Arguments for the `resolve` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ResolveArgs {
    /// Packaged module directories (each holding META-INF/MANIFEST.MF)
    pub modules: Vec<PathBuf>,

    /// Module directories under development (repeatable)
    #[arg(long, value_name = "DIR")]
    pub dev: Vec<PathBuf>,

    /// Print the resolution report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `environments` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct EnvironmentsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resolve_with_dev_dirs() {
        let cli = Cli::parse_from(["modgraph", "resolve", "a", "b", "--dev", "c", "--json"]);
        let Commands::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.modules, [PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(args.dev, [PathBuf::from("c")]);
        assert!(args.json);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["modgraph", "environments", "--debug", "--no-color"]);
        assert!(cli.debug);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Environments(_)));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["modgraph"]).is_err());
    }
}
