//! # vkit CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Without a subcommand the generation flags apply directly.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vkit_cli::check::{run_check, CheckArgs};
use vkit_cli::gen::{run_gen, GenArgs};

/// JSON Schema generation from Rust types and request validation tooling.
#[derive(Parser, Debug)]
#[command(name = "vkit", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    gen: GenArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate JSON Schemas from Rust type declarations.
    Gen(GenArgs),

    /// Validate a JSON document against a registered schema.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("vkit CLI starting");

    let result = match cli.command {
        Some(Commands::Gen(args)) => run_gen(&args),
        Some(Commands::Check(args)) => run_check(&args),
        None => run_gen(&cli.gen),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vkit_core::Section;

    #[test]
    fn cli_parse_default_gen() {
        let cli = Cli::try_parse_from([
            "vkit",
            "--include",
            "src/**/*.rs,lib/*.rs",
            "--types",
            "TestType,NextStepRequest",
            "--no-top-ref",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.gen.include, ["src/**/*.rs", "lib/*.rs"]);
        assert_eq!(cli.gen.types, ["TestType", "NextStepRequest"]);
        assert!(cli.gen.no_top_ref);
        assert!(!cli.gen.extra_props);
        assert_eq!(cli.gen.out, PathBuf::from("src/schemas"));
        assert_eq!(cli.gen.id_prefix, "#/schemas/");
    }

    #[test]
    fn cli_parse_gen_subcommand() {
        let cli = Cli::try_parse_from([
            "vkit",
            "gen",
            "--manifest",
            "Cargo.toml",
            "--types",
            "A",
            "--out",
            "schemas",
            "--no-record-additional-props",
        ])
        .unwrap();
        let Some(Commands::Gen(args)) = cli.command else {
            panic!("expected gen subcommand");
        };
        assert_eq!(args.manifest, Some(PathBuf::from("Cargo.toml")));
        assert_eq!(args.out, PathBuf::from("schemas"));
        assert!(args.no_record_additional_props);
    }

    #[test]
    fn cli_parse_check() {
        let cli = Cli::try_parse_from([
            "vkit",
            "check",
            "--schemas",
            "src/schemas",
            "--id",
            "#/schemas/A.json",
            "--section",
            "query",
            "doc.json",
        ])
        .unwrap();
        let Some(Commands::Check(args)) = cli.command else {
            panic!("expected check subcommand");
        };
        assert_eq!(args.file, PathBuf::from("doc.json"));
        assert_eq!(args.section, Section::Query);
        assert!(args.config.is_none());
    }

    #[test]
    fn cli_verbose_count() {
        let cli = Cli::try_parse_from(["vkit", "-vv", "check", "--schemas", "s", "--id", "x", "f"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_rejects_unknown_section() {
        let result = Cli::try_parse_from([
            "vkit", "check", "--schemas", "s", "--id", "x", "--section", "headers", "f",
        ]);
        assert!(result.is_err());
    }
}
