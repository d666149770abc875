//! # CLI Interface
//!
//! Command-line argument structure for `blockart-node`, via `clap`
//! derive. Three subcommands: `run`, `init`, and `version`.
//!
//! Every configurable value has an environment-variable fallback so a
//! container deployment doesn't need a wall of flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// BlockArt ink miner node.
///
/// Mines proof-of-work blocks over canvas operations, gossips with peer
/// miners, and serves the art-node API for this miner's keypair.
#[derive(Parser, Debug)]
#[command(
    name = "blockart-node",
    about = "BlockArt ink miner",
    version,
    propagate_version = true
)]
pub struct BlockartNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ink miner.
    Run(RunArgs),
    /// Generate a miner keypair.
    Init(InitArgs),
    /// Print version information.
    Version,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Directory server base URL. Omit to run standalone with devnet
    /// settings.
    #[arg(long, env = "BLOCKART_SERVER")]
    pub server: Option<String>,

    /// Path to the hex-encoded miner secret key.
    #[arg(long, env = "BLOCKART_KEY_FILE", default_value = "miner.key")]
    pub key_file: PathBuf,

    /// Port for the peer RPC and art-node API.
    #[arg(long, env = "BLOCKART_RPC_PORT", default_value_t = blockart_protocol::config::DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "BLOCKART_METRICS_PORT", default_value_t = blockart_protocol::config::DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Base URL other miners should reach this node on. Defaults to
    /// http://<hostname>:<rpc_port>.
    #[arg(long, env = "BLOCKART_PUBLIC_ADDR")]
    pub public_addr: Option<String>,

    /// Comma-separated peer base URLs to connect to at startup, in
    /// addition to (or instead of) directory-server discovery.
    #[arg(long, env = "BLOCKART_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Emit logs as JSON instead of human-readable lines.
    #[arg(long, env = "BLOCKART_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Where to write the hex-encoded secret key.
    #[arg(long, env = "BLOCKART_KEY_FILE", default_value = "miner.key")]
    pub key_file: PathBuf,
}
