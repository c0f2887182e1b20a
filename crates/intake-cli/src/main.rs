//! Intake CLI - Command-line utility for validating, storing and serving
//! untrusted uploads.

mod cli;
mod commands;
mod error;
mod output;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    match run(&cli, &*formatter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.format_error(cli.command.name(), &err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &cli::Cli, formatter: &dyn output::OutputFormatter) -> Result<()> {
    let policy = cli.policy.as_deref();
    let root = cli.root.as_deref();

    match &cli.command {
        cli::Commands::Sanitize(args) => commands::sanitize::execute(args, formatter),
        cli::Commands::Scan(args) => {
            let validator = commands::build_validator(policy, root)?;
            commands::scan::execute(args, &validator, formatter)
        }
        cli::Commands::Ingest(args) => {
            let validator = commands::build_validator(policy, root)?;
            commands::ingest::execute(args, &validator, formatter)
        }
        cli::Commands::ServeCheck(args) => {
            let validator = commands::build_validator(policy, root)?;
            commands::serve_check::execute(args, &validator, formatter)
        }
        cli::Commands::Policy => {
            let config = commands::load_policy(policy, root)?;
            commands::policy::execute(&config, formatter)
        }
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays parseable with `--json`.
fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
