//! Roster Service
//!
//! Serves the roster HTTP API from an in-memory threshold simulator.

use anyhow::Result;
use calypso_core::MemoryRoster;
use calypso_svc::{serve, AppState};
use clap::Parser;
use tracing::{info, Level};

/// Roster service CLI arguments
#[derive(Parser, Debug)]
#[command(name = "calypso-svc")]
#[command(about = "Development roster service for the secret workflow")]
#[command(version)]
struct Args {
    /// Listen address
    #[arg(short, long, env = "CALYPSO_LISTEN", default_value = "127.0.0.1:7770")]
    listen: String,

    /// Roster node addresses to simulate as offline
    #[arg(long)]
    offline: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!(
        listen = %args.listen,
        offline = ?args.offline,
        "Starting roster service"
    );

    let roster = MemoryRoster::new();
    for address in &args.offline {
        roster.set_online(address, false);
    }

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    info!(address = %args.listen, "Listening");

    serve(listener, AppState::new(roster)).await?;

    Ok(())
}
