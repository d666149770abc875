//! # Directory Server Client
//!
//! Registration, peer discovery, and heartbeats against the BlockArt
//! directory server. The server owns the network settings (difficulty,
//! ink rewards, canvas size); a miner that can't register can't know
//! which network it is on, so `run` refuses to start without either a
//! directory server or `--standalone` devnet settings.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use blockart_protocol::config::{MinerNetSettings, HEARTBEAT_TIME_BUFFER_MS};

/// Registration payload: where to reach this miner and who it is.
#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    address: &'a str,
    pub_key_string: &'a str,
}

#[derive(Debug, Serialize)]
struct KeyedRequest<'a> {
    pub_key_string: &'a str,
}

#[derive(Debug, Deserialize)]
struct NodesResponse {
    addresses: Vec<String>,
}

/// Thin HTTP client for the directory server.
#[derive(Clone)]
pub struct DirectoryClient {
    base: String,
    http: reqwest::Client,
    pub_key_string: String,
}

impl DirectoryClient {
    pub fn new(base: &str, pub_key_string: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            pub_key_string: pub_key_string.to_string(),
        }
    }

    /// Registers this miner and returns the network settings.
    pub async fn register(&self, public_addr: &str) -> anyhow::Result<MinerNetSettings> {
        let settings = self
            .http
            .post(format!("{}/register", self.base))
            .json(&RegisterRequest {
                address: public_addr,
                pub_key_string: &self.pub_key_string,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<MinerNetSettings>()
            .await?;
        info!(genesis = %settings.genesis_block_hash, "registered with directory server");
        Ok(settings)
    }

    /// Asks the server for peer miner addresses.
    pub async fn get_nodes(&self) -> anyhow::Result<Vec<String>> {
        let response = self
            .http
            .post(format!("{}/nodes", self.base))
            .json(&KeyedRequest { pub_key_string: &self.pub_key_string })
            .send()
            .await?
            .error_for_status()?
            .json::<NodesResponse>()
            .await?;
        Ok(response.addresses)
    }

    /// Sends one heartbeat.
    async fn heartbeat(&self) -> anyhow::Result<()> {
        self.http
            .post(format!("{}/heartbeat", self.base))
            .json(&KeyedRequest { pub_key_string: &self.pub_key_string })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Heartbeats forever, slightly faster than the server's timeout so a
    /// beat is always in flight before the deadline.
    pub async fn run_heartbeat_loop(self, heartbeat_ms: u32) {
        let interval = std::time::Duration::from_millis(
            (heartbeat_ms as u64).saturating_sub(HEARTBEAT_TIME_BUFFER_MS).max(100),
        );
        loop {
            if let Err(err) = self.heartbeat().await {
                warn!(error = %err, "heartbeat to directory server failed");
            }
            tokio::time::sleep(interval).await;
        }
    }
}
