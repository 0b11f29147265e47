//! Atrium CLI - administration of extension lifecycle state
//!
//! This is the main entry point for the Atrium command-line interface.

mod cli;
mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use context::StateContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let ctx = StateContext::open(cli.config_dir.clone())?;

    match cli.command {
        Commands::Config(args) => commands::config::run(args, &ctx).await,
        Commands::AutoUpdate(args) => commands::auto_update::run(args, &ctx).await,
        Commands::Notifications(args) => commands::notifications::run(args, &ctx).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
