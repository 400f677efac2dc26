use std::fs::File;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use node::{Node, NodeConfig};
use types::pow_target;

#[derive(Parser, Debug)]
#[command(name = "orecoin", about = "A small UTXO proof-of-work node")]
struct Args {
    /// JSON config file; flags below override it.
    #[arg(long)]
    config_file: Option<PathBuf>,
    #[arg(long, default_value_t = 9500)]
    port: u16,
    #[arg(long)]
    host: Option<String>,
    /// Peers to handshake with at startup; may repeat.
    #[arg(long)]
    peer: Vec<String>,
    /// Start mining once connected.
    #[arg(long)]
    mine: bool,
    /// Leading zeros of the difficulty target.
    #[arg(long)]
    pow_zeros: Option<i32>,
    /// Pull missing history from peers after connecting.
    #[arg(long)]
    bootstrap: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config_file {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => NodeConfig::new(args.port),
    };
    config.port = args.port;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(zeros) = args.pow_zeros {
        config.miner.pow_target = pow_target(zeros);
    }
    if args.mine {
        config.miner.enabled = true;
    }

    let node = Node::new(config)?;
    node.start().await?;

    for peer in &args.peer {
        node.connect_to_peer(peer).await;
    }
    if args.bootstrap {
        if let Err(error) = node.bootstrap().await {
            warn!(%error, "bootstrap failed");
        }
    }
    if args.mine {
        node.start_miner().await;
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    node.kill().await;
    Ok(())
}
