//! # Miner State
//!
//! Everything a miner knows, in one owned container: the operation
//! buckets, the ink ledger, the block store, and the art-node auth sets.
//! One container, one mutex — `changeBlockchainHead` must be atomic with
//! respect to every other read and write, including in-flight ink
//! validations, and a single coarse lock is the simplest thing that is
//! obviously correct.

use std::collections::HashSet;

use crate::chain::{Block, BlockStore, InkLedger, OpBuckets};
use crate::config::MinerNetSettings;

/// The complete mutable state of a miner.
#[derive(Debug, Clone)]
pub struct MinerState {
    /// The four operation lifecycle buckets.
    pub ops: OpBuckets,
    /// Per-owner ink accounts.
    pub ledger: InkLedger,
    /// Block arena, child index, and tip.
    pub blocks: BlockStore,
    /// Outstanding authentication nonces handed to art nodes. Single-use.
    pub nonces: HashSet<String>,
    /// Tokens issued to authenticated art nodes.
    pub tokens: HashSet<String>,
}

impl MinerState {
    /// Fresh state with the genesis block injected under the
    /// network-assigned genesis hash.
    pub fn new(settings: &MinerNetSettings, miner_pub_key: &str) -> Self {
        Self {
            ops: OpBuckets::new(),
            ledger: InkLedger::new(),
            blocks: BlockStore::new(
                &settings.genesis_block_hash,
                Block::genesis(miner_pub_key),
            ),
            nonces: HashSet::new(),
            tokens: HashSet::new(),
        }
    }
}
