//! Calypso CLI
//!
//! Command-line interface for the secret workflow:
//! - Create a distributed long-term secret
//! - Register write and read requests
//! - Decrypt the key of a write

use anyhow::Result;
use calypso_client::RosterClient;
use calypso_core::{codec, recover, Orchestrator, ReadSecret, Roster};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info, Level};

type Client = Orchestrator<RosterClient>;

/// Calypso - threshold secret workflow client
#[derive(Parser)]
#[command(name = "calypso")]
#[command(about = "Create, write, read and decrypt secrets held by a roster")]
#[command(version)]
struct Cli {
    /// Debug level: 1 for terse, 5 for maximal
    #[arg(short, long, global = true, default_value_t = 0)]
    debug: u8,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "CALYPSO_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RosterArgs {
    /// Roster file of the nodes holding the secret
    #[arg(short, long, env = "CALYPSO_ROSTER")]
    roster: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a distributed long-term secret
    CreateSecret {
        #[command(flatten)]
        roster: RosterArgs,
    },

    /// Add a write request and print its address
    AddWrite {
        #[command(flatten)]
        roster: RosterArgs,

        /// LTS id returned by create-secret (hex)
        #[arg(long, alias = "LTSID")]
        lts_id: String,

        /// Aggregate public key of the LTS (hex)
        #[arg(short = 'X', long)]
        public_key: String,

        /// Encrypted symmetric key material (hex)
        #[arg(short, long)]
        payload: String,
    },

    /// Add a read request and print its address and secret
    AddRead {
        #[command(flatten)]
        roster: RosterArgs,

        /// Address of the write request
        #[arg(short, long, alias = "wr")]
        write: String,
    },

    /// Decrypt the key of a write through one of its reads
    DecryptKey {
        #[command(flatten)]
        roster: RosterArgs,

        /// Address of the write request
        #[arg(short, long, alias = "wr")]
        write: String,

        /// Address of the read request
        #[arg(long, alias = "rr")]
        read: String,

        /// Secret printed by add-read; recovers the key locally when given
        #[arg(short, long)]
        secret: Option<String>,
    },
}

fn log_level(debug: u8) -> Level {
    match debug {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for results
    let level = log_level(cli.debug);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", render_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// Failure line printed on stderr, tagged with the stable error kind
fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<calypso_core::Error>() {
        Some(e) if e.is_local() => format!("error[{}]: {} (rejected locally)", e.kind(), e),
        Some(e) => format!("error[{}]: {}", e.kind(), e),
        None => format!("error: {:#}", err),
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let client = RosterClient::new().with_timeout(Duration::from_secs(cli.timeout));
    let orchestrator = Orchestrator::new(client);

    match &cli.command {
        Commands::CreateSecret { roster } => {
            run_create_secret(&orchestrator, roster).await?;
        }
        Commands::AddWrite {
            roster,
            lts_id,
            public_key,
            payload,
        } => {
            run_add_write(&orchestrator, roster, lts_id, public_key, payload).await?;
        }
        Commands::AddRead { roster, write } => {
            run_add_read(&orchestrator, roster, write).await?;
        }
        Commands::DecryptKey {
            roster,
            write,
            read,
            secret,
        } => {
            run_decrypt_key(&orchestrator, roster, write, read, secret.as_deref()).await?;
        }
    }

    Ok(())
}

fn load_roster(args: &RosterArgs) -> Result<Roster> {
    let roster = Roster::load(&args.roster)?;
    info!(path = ?args.roster, nodes = roster.len(), "Roster loaded");
    for server in roster.servers() {
        debug!(address = %server.address, description = %server.description, "Roster node");
    }
    Ok(roster)
}

async fn run_create_secret(orchestrator: &Client, args: &RosterArgs) -> Result<()> {
    let roster = load_roster(args)?;

    let lts = orchestrator.create_lts(&roster).await?;

    println!("LTSID: {}", lts.id);
    println!("X: {}", lts.public_key_hex());

    Ok(())
}

async fn run_add_write(
    orchestrator: &Client,
    args: &RosterArgs,
    lts_id: &str,
    public_key: &str,
    payload: &str,
) -> Result<()> {
    let roster = load_roster(args)?;
    let payload = codec::decode(payload)?;

    let write = orchestrator
        .add_write(&roster, lts_id, public_key, &payload)
        .await?;

    println!("Write address: {}", write);

    Ok(())
}

async fn run_add_read(orchestrator: &Client, args: &RosterArgs, write: &str) -> Result<()> {
    let roster = load_roster(args)?;

    let record = orchestrator.add_read(&roster, write).await?;

    println!("Secret: {}", record.secret.to_hex());
    println!("Read address: {}", record.read);

    Ok(())
}

async fn run_decrypt_key(
    orchestrator: &Client,
    args: &RosterArgs,
    write: &str,
    read: &str,
    secret: Option<&str>,
) -> Result<()> {
    let roster = load_roster(args)?;

    // Reject a malformed secret before the read is spent
    let secret = secret.map(ReadSecret::from_hex).transpose()?;
    if let Some(secret) = &secret {
        recover::secret_scalar(secret)?;
    }

    let result = orchestrator.decrypt_key(&roster, write, read).await?;

    let cs: Vec<String> = result.cs.iter().map(codec::encode_point_hex).collect();
    println!("Xhat: {}", codec::encode_point_hex(&result.xhat_enc));
    println!("Cs: {}", cs.join(","));
    println!("X: {}", codec::encode_point_hex(&result.public_key));
    println!("Masked key: {}", hex::encode(&result.masked_key));

    if let Some(secret) = &secret {
        let key = recover::recover_key(secret, &result)?;
        println!("Key: {}", hex::encode(key));
    }

    Ok(())
}
