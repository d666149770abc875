//! # Gossip Dissemination
//!
//! Epidemic propagation of blocks and operations. When the miner engine
//! hands back [`Outbound`] messages, this layer chooses the peers to
//! forward them to (up to the fanout) and suppresses anything already
//! sent.
//!
//! Loop termination is primarily the miner's job — a block already in the
//! chain map or an op already in a lifecycle bucket is never re-announced.
//! The bounded seen-cache here is the second line: it stops the node from
//! re-sending a payload it has already pushed, whatever the state of the
//! buckets, and caps memory under churn by evicting the oldest half when
//! full.
//!
//! Peer bookkeeping lives here too: addresses, liveness stamps, and
//! pruning when a ping fails.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{GOSSIP_FANOUT, GOSSIP_SEEN_CACHE_SIZE};
use crate::miner::Outbound;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for the gossip layer.
#[derive(Debug, Clone)]
pub struct GossipConfig {
    /// Peers each message is forwarded to.
    pub fanout: usize,
    /// Maximum peer connections tracked.
    pub max_peers: usize,
    /// Seen-cache capacity before eviction.
    pub seen_cache_size: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            fanout: GOSSIP_FANOUT,
            max_peers: 50,
            seen_cache_size: GOSSIP_SEEN_CACHE_SIZE,
        }
    }
}

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

/// A known peer miner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Base address for the peer's RPC endpoint.
    pub address: String,
    /// Monotonic stamp of the last successful exchange, for pruning
    /// decisions by the node runtime.
    pub last_seen: u64,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// One planned send: a payload and the peer addresses to push it to.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub targets: Vec<String>,
    pub message: Outbound,
}

// ---------------------------------------------------------------------------
// GossipEngine
// ---------------------------------------------------------------------------

/// Plans dissemination and tracks peers. Performs no I/O.
pub struct GossipEngine {
    config: GossipConfig,
    peers: RwLock<Vec<PeerInfo>>,
    /// Content ids (block hash / op signature) already pushed, with a
    /// logical insertion stamp for eviction ordering.
    seen: DashMap<String, u64>,
    clock: std::sync::atomic::AtomicU64,
}

impl GossipEngine {
    pub fn new(config: GossipConfig) -> Self {
        Self {
            config,
            peers: RwLock::new(Vec::new()),
            seen: DashMap::new(),
            clock: std::sync::atomic::AtomicU64::new(0),
        }
    }

    // -- Peer registry ------------------------------------------------------

    /// Registers a peer address; duplicates and overflow are ignored.
    pub fn add_peer(&self, address: &str) {
        let mut peers = self.peers.write();
        if peers.len() < self.config.max_peers && !peers.iter().any(|p| p.address == address) {
            debug!(peer = %address, "peer added");
            peers.push(PeerInfo {
                address: address.to_string(),
                last_seen: self.tick(),
            });
        }
    }

    pub fn remove_peer(&self, address: &str) {
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|p| p.address != address);
        if peers.len() != before {
            debug!(peer = %address, "peer removed");
        }
    }

    /// Refreshes a peer's liveness stamp.
    pub fn mark_alive(&self, address: &str) {
        let stamp = self.tick();
        let mut peers = self.peers.write();
        if let Some(peer) = peers.iter_mut().find(|p| p.address == address) {
            peer.last_seen = stamp;
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.read().len()
    }

    pub fn peer_addresses(&self) -> Vec<String> {
        self.peers.read().iter().map(|p| p.address.clone()).collect()
    }

    // -- Dissemination planning ---------------------------------------------

    /// Turns engine output into targeted sends.
    ///
    /// `exclude` is the peer the triggering message arrived from; nothing
    /// is echoed back to its sender. Payloads already pushed once are
    /// dropped here even if the engine re-emits them.
    pub fn plan(&self, outbound: Vec<Outbound>, exclude: Option<&str>) -> Vec<Dispatch> {
        let mut dispatches = Vec::new();
        for message in outbound {
            let content_id = match &message {
                Outbound::Block { hash, .. } => hash.clone(),
                Outbound::Op(record) => record.op_sig.clone(),
            };
            if !self.first_sighting(&content_id) {
                trace!(id = %content_id, "suppressing re-send");
                continue;
            }

            let targets: Vec<String> = {
                let peers = self.peers.read();
                peers
                    .iter()
                    .filter(|p| Some(p.address.as_str()) != exclude)
                    .take(self.config.fanout)
                    .map(|p| p.address.clone())
                    .collect()
            };
            if targets.is_empty() {
                debug!(id = %content_id, "no peers to gossip to");
                continue;
            }
            dispatches.push(Dispatch { targets, message });
        }
        dispatches
    }

    /// Records a content id; true when it was not seen before.
    fn first_sighting(&self, content_id: &str) -> bool {
        let stamp = self.tick();
        let new = self.seen.insert(content_id.to_string(), stamp).is_none();
        if new {
            self.maybe_evict();
        }
        new
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    /// Drops the oldest half of the seen-cache once it overflows.
    fn maybe_evict(&self) {
        if self.seen.len() <= self.config.seen_cache_size {
            return;
        }
        let mut entries: Vec<(String, u64)> = self
            .seen
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        entries.sort_by_key(|(_, stamp)| *stamp);
        for (id, _) in entries.iter().take(entries.len() / 2) {
            self.seen.remove(id);
        }
    }
}

impl Default for GossipEngine {
    fn default() -> Self {
        Self::new(GossipConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Block;

    fn block_msg(tag: &str) -> Outbound {
        Outbound::Block {
            block: Block::genesis("miner"),
            hash: tag.to_string(),
        }
    }

    #[test]
    fn peers_deduplicate() {
        let g = GossipEngine::default();
        g.add_peer("http://a:8650");
        g.add_peer("http://a:8650");
        g.add_peer("http://b:8650");
        assert_eq!(g.peer_count(), 2);

        g.remove_peer("http://a:8650");
        assert_eq!(g.peer_count(), 1);
    }

    #[test]
    fn max_peers_is_enforced() {
        let g = GossipEngine::new(GossipConfig { max_peers: 2, ..Default::default() });
        g.add_peer("a");
        g.add_peer("b");
        g.add_peer("c");
        assert_eq!(g.peer_count(), 2);
    }

    #[test]
    fn plan_targets_fanout_without_sender() {
        let g = GossipEngine::new(GossipConfig { fanout: 2, ..Default::default() });
        g.add_peer("a");
        g.add_peer("b");
        g.add_peer("c");

        let dispatches = g.plan(vec![block_msg("h1")], Some("a"));
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].targets, vec!["b", "c"]);
    }

    #[test]
    fn repeated_payloads_are_suppressed() {
        let g = GossipEngine::default();
        g.add_peer("a");

        assert_eq!(g.plan(vec![block_msg("h1")], None).len(), 1);
        assert!(g.plan(vec![block_msg("h1")], None).is_empty());
        // A different payload still flows.
        assert_eq!(g.plan(vec![block_msg("h2")], None).len(), 1);
    }

    #[test]
    fn no_peers_means_no_dispatches() {
        let g = GossipEngine::default();
        assert!(g.plan(vec![block_msg("h1")], None).is_empty());
    }

    #[test]
    fn seen_cache_evicts_oldest_half() {
        let g = GossipEngine::new(GossipConfig { seen_cache_size: 4, ..Default::default() });
        g.add_peer("a");
        for i in 0..6 {
            g.plan(vec![block_msg(&format!("h{i}"))], None);
        }
        // Early ids were evicted, so they are "new" again.
        assert_eq!(g.plan(vec![block_msg("h0")], None).len(), 1);
        // The latest id is still remembered.
        assert!(g.plan(vec![block_msg("h5")], None).is_empty());
    }
}
