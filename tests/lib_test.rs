//! Library integration tests.

use modgraph::ModGraphError;

#[test]
fn error_types_are_public() {
    let err = ModGraphError::InvalidVersion {
        input: "1.x".into(),
        message: "bad minor".into(),
    };
    assert!(err.to_string().contains("1.x"));
}

#[test]
fn result_type_alias_is_public() {
    fn test_fn() -> modgraph::Result<()> {
        Ok(())
    }
    assert!(test_fn().is_ok());
}

#[test]
fn cli_types_are_public() {
    use modgraph::cli::{Cli, Commands};
    use clap::Parser;

    let cli = Cli::parse_from(["modgraph", "environments", "--json"]);

    if let Commands::Environments(args) = cli.command {
        assert!(args.json);
    } else {
        panic!("Expected Environments command");
    }
}
