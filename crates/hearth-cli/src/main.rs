//! # hearth
//!
//! Command-line front end for the local Hearth backend. Each invocation
//! opens the configured storage partition, restores the persisted session
//! and runs one command.

mod commands;
mod config;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hearth_store::{Backend, BackendOptions};

use crate::commands::Cli;
use crate::config::CliConfig;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays clean (respects RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,hearth_store=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // clap exits with status 2 on usage errors.
    let cli = Cli::parse();

    let config = CliConfig::from_env();
    info!(?config, "Loaded configuration");

    let kv = config.open_store()?;
    let backend = Backend::open(
        kv,
        BackendOptions {
            seed_demo: config.seed_demo,
        },
    )?;

    let stdout = std::io::stdout();
    commands::run(&backend, cli.command, &mut stdout.lock())
}
