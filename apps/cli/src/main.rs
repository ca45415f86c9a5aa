//! `formwork`: validate values and evaluate rules for form schemas from the
//! command line. Output is JSON on stdout; logs go to stderr.

mod cli;
mod commands;
mod settings;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use formwork_engine::FormEngine;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::commands::Runner;
use crate::settings::Settings;

/// Exit code for usage, I/O and schema errors.
const FAILURE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(FAILURE)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(cli.verbose, &settings.log_level);
    tracing::debug!(?settings, "loaded settings");

    let runner = Runner::new(FormEngine::new(settings.engine), cli.pretty);
    match &cli.command {
        Command::Check(args) => runner.check(args),
        Command::Effects(args) => runner.effects(args),
        Command::Derive(args) => runner.derive(args),
        Command::Lint(args) => runner.lint(args),
    }
}

/// `RUST_LOG` wins; otherwise `-v` picks the level, falling back to the
/// configured one.
fn init_logging(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
