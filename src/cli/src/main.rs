//! Tensor CLI - inspect access grants from an exported snapshot.
//!
//! Provides commands for capability checks, access lists and assignable roles.

mod commands;
mod output;
mod snapshot;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{access, check, roles};
use output::OutputFormat;
use snapshot::Snapshot;
use tensor_core::config::Config;
use tensor_core::telemetry::{init_logging, LogFormat};

/// Tensor - access resolution CLI
#[derive(Parser)]
#[command(
    name = "tensor",
    author = "Tensor Contributors",
    version = "0.1.0",
    about = "Tensor - access resolution for credentials, inventories, projects and templates",
    long_about = "CLI tool for checking capabilities and listing access grants against a grant snapshot.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Grant snapshot (JSON or YAML)
    #[arg(short, long, global = true, env = "TENSOR_SNAPSHOT", default_value = "tensor-snapshot.json")]
    snapshot: PathBuf,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, env = "TENSOR_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a user holds a capability on a resource
    Check(check::CheckArgs),

    /// List every user with a recorded grant on a resource
    AccessList(access::AccessListArgs),

    /// List the roles that can be granted on a resource
    Roles(roles::RolesArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let format = cli.output;
    match run(cli).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(2),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            if format == OutputFormat::Table {
                output::print_info("Use --help for usage");
            }
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.logging.format = LogFormat::Compact;
    Ok(config)
}

async fn run(cli: Cli) -> Result<bool> {
    let config = load_config(&cli)?;
    init_logging(&config.logging)?;

    let session = Snapshot::load(&cli.snapshot)?.into_session();
    let format = cli.output;

    match cli.command {
        Commands::Check(args) => check::execute(args, &session, &config.access, format).await,
        Commands::AccessList(args) => access::execute(args, &session, format).await.map(|_| true),
        Commands::Roles(args) => roles::execute(args, &session, format).await.map(|_| true),
    }
}
