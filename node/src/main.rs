// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # BlockArt Ink Miner Node
//!
//! Entry point for the `blockart-node` binary. Parses CLI arguments,
//! initializes logging and metrics, wires the protocol engine to its
//! HTTP adapters, and runs three concurrent concerns:
//!
//! - a dedicated OS thread driving the proof-of-work loop;
//! - a tokio runtime serving the peer RPC, art-node API, and metrics;
//! - background tasks for gossip dispatch, directory heartbeats, and
//!   peer top-up.

mod api;
mod cli;
mod directory;
mod logging;
mod metrics;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use blockart_protocol::config::MinerNetSettings;
use blockart_protocol::crypto::MinerKeypair;
use blockart_protocol::miner::{MineOutcome, Miner};
use blockart_protocol::net::gossip::{GossipConfig, GossipEngine};

use cli::{BlockartNodeCli, Commands};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Nonce attempts per mining slice. Between slices the loop checks the
/// shutdown flag; tip changes interrupt the engine on their own.
const MINING_SLICE: u64 = 500_000;

fn main() -> Result<()> {
    let cli = BlockartNodeCli::parse();
    match cli.command {
        Commands::Run(args) => run_node(args),
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the miner: key load, settings, bootstrap, mining thread, and
/// the HTTP servers.
fn run_node(args: cli::RunArgs) -> Result<()> {
    let format = if args.log_json { LogFormat::Json } else { LogFormat::Pretty };
    logging::init_logging("blockart_node=info,blockart_protocol=info", format);

    // --- Identity ---
    let key_hex = std::fs::read_to_string(&args.key_file)
        .with_context(|| {
            format!(
                "failed to read key file {} (run `blockart-node init` first)",
                args.key_file.display()
            )
        })?;
    let keypair = MinerKeypair::from_hex(key_hex.trim())
        .map_err(|e| anyhow::anyhow!("invalid key file: {e}"))?;
    let pub_key_string = keypair.public_key_string();
    info!(miner = %&pub_key_string[..16], "loaded miner identity");

    let public_addr = args.public_addr.clone().unwrap_or_else(|| {
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        format!("http://{host}:{}", args.rpc_port)
    });

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;

    // --- Settings: directory server or standalone devnet ---
    let directory_client = args
        .server
        .as_deref()
        .map(|server| directory::DirectoryClient::new(server, &pub_key_string));
    let settings: MinerNetSettings = match &directory_client {
        Some(client) => runtime
            .block_on(client.register(&public_addr))
            .context("registration with directory server failed")?,
        None => {
            info!("no directory server configured, using standalone devnet settings");
            MinerNetSettings::devnet()
        }
    };

    // --- Core wiring ---
    let miner = Arc::new(Miner::new(settings.clone(), keypair));
    let gossip = Arc::new(GossipEngine::new(GossipConfig::default()));
    let node_metrics: metrics::SharedMetrics = Arc::new(NodeMetrics::new());
    let app_state = api::AppState {
        miner: Arc::clone(&miner),
        gossip: Arc::clone(&gossip),
        http: reqwest::Client::new(),
        metrics: Arc::clone(&node_metrics),
        public_addr: public_addr.clone(),
    };

    // --- Peer bootstrap: explicit peers plus directory discovery ---
    let mut peer_addrs = args.peers.clone();
    if let Some(client) = &directory_client {
        match runtime.block_on(client.get_nodes()) {
            Ok(addrs) => peer_addrs.extend(addrs),
            Err(err) => warn!(error = %err, "peer discovery failed, starting with explicit peers only"),
        }
    }
    runtime.block_on(bootstrap_peers(&app_state, &peer_addrs));

    // --- Mining thread ---
    let shutdown = Arc::new(AtomicBool::new(false));
    let mining_handle = {
        let miner = Arc::clone(&miner);
        let shutdown = Arc::clone(&shutdown);
        let state = app_state.clone();
        let handle = runtime.handle().clone();
        std::thread::Builder::new()
            .name("pow-miner".to_string())
            .spawn(move || mining_loop(miner, shutdown, state, handle))
            .context("failed to spawn mining thread")?
    };

    // --- Servers and background tasks ---
    let result = runtime.block_on(serve(
        app_state,
        directory_client,
        settings,
        args.rpc_port,
        args.metrics_port,
    ));

    shutdown.store(true, Ordering::Release);
    let _ = mining_handle.join();
    info!("blockart-node stopped");
    result
}

/// The dedicated proof-of-work thread. Mines in bounded slices so the
/// shutdown flag is observed promptly; found blocks are handed to the
/// async side for dissemination.
fn mining_loop(
    miner: Arc<Miner>,
    shutdown: Arc<AtomicBool>,
    state: api::AppState,
    handle: tokio::runtime::Handle,
) {
    info!("mining loop started");
    while !shutdown.load(Ordering::Acquire) {
        match miner.mine_next(Some(MINING_SLICE)) {
            MineOutcome::Mined { hash, outbound, .. } => {
                state.metrics.blocks_mined_total.inc();
                let state = state.clone();
                handle.spawn(async move {
                    api::dispatch(&state, outbound, None);
                });
                tracing::debug!(hash = %hash, "dispatched mined block");
            }
            MineOutcome::Interrupted => {
                // Tip moved; loop around and mine on the new head.
            }
            MineOutcome::Exhausted => {
                // Slice boundary; re-check shutdown and continue.
            }
        }
    }
    info!("mining loop stopped");
}

/// Announces ourselves to each peer, registers it for gossip, and adopts
/// the longest valid chain any of them offers.
async fn bootstrap_peers(state: &api::AppState, peers: &[String]) {
    let mut best: Option<(String, Vec<blockart_protocol::chain::Block>)> = None;

    for peer in peers {
        if peer.is_empty() || *peer == state.public_addr {
            continue;
        }
        if let Err(err) = api::announce_to(state, peer).await {
            warn!(peer = %peer, error = %err, "peer unreachable during bootstrap");
            continue;
        }
        state.gossip.add_peer(peer);

        match api::fetch_blockchain(state, peer).await {
            Ok(snapshot) => {
                let longer = best
                    .as_ref()
                    .map(|(_, chain)| snapshot.chain.len() > chain.len())
                    .unwrap_or(true);
                if longer && !snapshot.chain.is_empty() {
                    best = Some((snapshot.tip_hash, snapshot.chain));
                }
            }
            Err(err) => warn!(peer = %peer, error = %err, "chain fetch failed during bootstrap"),
        }
    }

    if let Some((tip, chain)) = best {
        match state.miner.adopt_chain(&tip, chain) {
            Ok(true) => info!(tip = %tip, "bootstrapped onto peer chain"),
            Ok(false) => info!("our chain is already the longest"),
            Err(err) => warn!(error = %err, "peer chain failed validation, keeping our own"),
        }
    }
}

/// Runs the RPC and metrics servers plus heartbeats until shutdown.
async fn serve(
    state: api::AppState,
    directory_client: Option<directory::DirectoryClient>,
    settings: MinerNetSettings,
    rpc_port: u16,
    metrics_port: u16,
) -> Result<()> {
    let rpc_router = api::create_router(state.clone());
    let rpc_addr = format!("0.0.0.0:{rpc_port}");
    let rpc_listener = tokio::net::TcpListener::bind(&rpc_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {rpc_addr}"))?;
    info!("peer RPC and art API listening on {rpc_addr}");

    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&state.metrics));
    let metrics_addr = format!("0.0.0.0:{metrics_port}");
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;
    info!("metrics listening on {metrics_addr}");

    if let Some(client) = directory_client.clone() {
        tokio::spawn(client.run_heartbeat_loop(settings.heartbeat_ms));
    }

    // Ping, prune, and top back up to the minimum connection count.
    tokio::spawn(maintain_peers(
        state.clone(),
        directory_client,
        settings.min_num_miner_connections as usize,
    ));

    tokio::select! {
        res = axum::serve(rpc_listener, rpc_router) => {
            if let Err(e) = res {
                tracing::error!("RPC server error: {e}");
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("metrics server error: {e}");
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received, draining connections");
        }
    }
    Ok(())
}

/// Periodically pings every known peer, drops the ones that fail, and —
/// when connections dip below the network minimum — asks the directory
/// server for fresh addresses.
async fn maintain_peers(
    state: api::AppState,
    directory_client: Option<directory::DirectoryClient>,
    min_connections: usize,
) {
    let interval = std::time::Duration::from_secs(10);
    loop {
        tokio::time::sleep(interval).await;

        for peer in state.gossip.peer_addresses() {
            if api::ping_peer(&state, &peer).await {
                state.gossip.mark_alive(&peer);
            } else {
                warn!(peer = %peer, "peer failed ping, pruning");
                state.gossip.remove_peer(&peer);
            }
        }

        if state.gossip.peer_count() < min_connections {
            if let Some(client) = &directory_client {
                match client.get_nodes().await {
                    Ok(addrs) => bootstrap_peers(&state, &addrs).await,
                    Err(err) => warn!(error = %err, "peer top-up failed"),
                }
            }
        }
        state.metrics.connected_peers.set(state.gossip.peer_count() as i64);
    }
}

/// Generates a miner keypair and writes the secret to disk.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("blockart_node=info", LogFormat::Pretty);

    let keypair = MinerKeypair::generate();
    std::fs::write(&args.key_file, keypair.secret_key_hex())
        .with_context(|| format!("failed to write key file {}", args.key_file.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&args.key_file, std::fs::Permissions::from_mode(0o600))?;
    }

    println!("Miner key generated.");
    println!("  Key file   : {}", args.key_file.display());
    println!("  Public key : {}", keypair.public_key_string());
    Ok(())
}

fn print_version() {
    println!("blockart-node {}", env!("CARGO_PKG_VERSION"));
}

/// Resolves on SIGINT or SIGTERM, whichever lands first.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
