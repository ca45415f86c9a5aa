use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "formwork",
    about = "Check form schemas, validate values and evaluate rules",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file (defaults to `formwork.toml` when present)
    #[arg(long, value_name = "PATH", global = true, env = "FORMWORK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a values document against a schema
    Check(CheckArgs),
    /// Evaluate rules and print the effect of every field
    Effects(EffectsArgs),
    /// Evaluate a derive expression
    Derive(DeriveArgs),
    /// Compile a schema and report structural errors
    Lint(LintArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema document (JSON)
    pub schema: PathBuf,
    /// Values object (JSON)
    pub values: PathBuf,
    /// Skip hidden fields and require rule-required ones
    #[arg(long)]
    pub effective: bool,
}

#[derive(Args, Debug)]
pub struct EffectsArgs {
    /// Schema document (JSON)
    pub schema: PathBuf,
    /// Context document: `{values, user, tenant, flags}`
    #[arg(long, value_name = "PATH")]
    pub context: Option<PathBuf>,
    /// Only evaluate fields that read these selectors
    #[arg(long = "changed", value_name = "SELECTOR")]
    pub changed: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DeriveArgs {
    /// Arithmetic expression, e.g. `values.a / values.b`
    pub expression: String,
    /// Context document: `{values, user, tenant, flags}`
    #[arg(long, value_name = "PATH")]
    pub context: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LintArgs {
    /// Schema documents (JSON)
    #[arg(required = true)]
    pub schemas: Vec<PathBuf>,
}
