//! relsign - release archive signing CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relsign_cli::cmd;
use relsign_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or warn with --quiet
    let default_level = if cli.quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sign(args) => cmd::sign::sign(&args).await,
        Commands::Checksum { files } => cmd::checksum::checksum(&files),
    }
}
