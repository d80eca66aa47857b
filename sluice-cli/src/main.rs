//! Sluice CLI — command-line entry point.

mod commands;

use clap::Parser;

use crate::commands::Commands;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Streams torrent media to a local HTTP player", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> sluice_core::Result<()> {
    let cli = Cli::parse();
    commands::run(cli.command).await
}
