//! Unified panelsync CLI.
//!
//! - `panelsync sync` - Run the reconciliation loop
//! - `panelsync client` - Inspect and edit clients on configured panels

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// panelsync unified CLI.
#[derive(Parser)]
#[command(
    name = "panelsync",
    version,
    about = "Quota and subscription reconciler for 3X-UI panels",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reconciliation loop.
    #[command(name = "sync", alias = "run")]
    Sync(panelsync_sync::SyncArgs),

    /// Inspect and edit panel clients.
    #[command(name = "client")]
    Client(panelsync_panel::ClientArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync(args) => panelsync_sync::cli::run(args).await,
        Commands::Client(args) => panelsync_panel::cli::run(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
