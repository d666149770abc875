//! # Mining and Chain Arbitration
//!
//! The engine that turns pending operations into blocks and keeps the
//! miner on the heaviest chain:
//!
//! - the proof-of-work search ([`Miner::mine_next`]), cancellable at
//!   nonce granularity whenever the tip moves;
//! - commit of locally mined blocks (insert, link, ink, bucket moves);
//! - [`changeBlockchainHead`-style reconciliation](Miner::change_blockchain_head)
//!   for fast-forwards and branch switches, with full ink rollback/replay
//!   and operation bucket migration;
//! - ingestion of peer blocks and operations, including the longest-chain
//!   rule and the deterministic equal-length tie-break (lexicographically
//!   greater hash wins);
//! - chain snapshots for peers and bootstrap adoption of a longer chain.
//!
//! ## Reorg accounting
//!
//! Applying a block touches the ledger for *every* record plus the mining
//! reward; reversing a block must therefore undo exactly the same set, or
//! a miner that rides out a few reorgs drifts away from its peers.
//! [`InkLedger::apply_block`] and [`InkLedger::reverse_block`] are exact
//! inverses and reconciliation only ever uses them in matched pairs.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::state::MinerState;
use super::Outbound;
use crate::chain::block::hash_meets_difficulty;
use crate::chain::ops::Bucket;
use crate::chain::Block;
use crate::config::MinerNetSettings;
use crate::crypto::MinerKeypair;
use crate::error::MinerError;

// ---------------------------------------------------------------------------
// MineOutcome
// ---------------------------------------------------------------------------

/// Result of one bounded proof-of-work attempt.
#[derive(Debug)]
pub enum MineOutcome {
    /// A block was found and committed; gossip it.
    Mined {
        block: Block,
        hash: String,
        outbound: Vec<Outbound>,
    },
    /// The tip moved underneath the search; restart on the new tip.
    Interrupted,
    /// The nonce budget ran out without a hit.
    Exhausted,
}

// ---------------------------------------------------------------------------
// Miner
// ---------------------------------------------------------------------------

/// The ink miner: settings, identity, and the single shared state.
pub struct Miner {
    settings: MinerNetSettings,
    keypair: MinerKeypair,
    pub_key_string: String,
    state: Mutex<MinerState>,
    /// Bumped on every tip change; the mining loop polls it between nonce
    /// attempts.
    tip_epoch: AtomicU64,
}

impl Miner {
    /// Creates a miner with genesis injected and the tip at genesis.
    pub fn new(settings: MinerNetSettings, keypair: MinerKeypair) -> Self {
        let pub_key_string = keypair.public_key_string();
        let state = MinerState::new(&settings, &pub_key_string);
        Self {
            settings,
            keypair,
            pub_key_string,
            state: Mutex::new(state),
            tip_epoch: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &MinerNetSettings {
        &self.settings
    }

    pub fn public_key_string(&self) -> &str {
        &self.pub_key_string
    }

    pub(crate) fn keypair(&self) -> &MinerKeypair {
        &self.keypair
    }

    /// Current tip-change epoch. Changes whenever the canonical chain
    /// head moves, for any reason.
    pub fn tip_epoch(&self) -> u64 {
        self.tip_epoch.load(Ordering::Acquire)
    }

    fn bump_tip_epoch(&self) {
        self.tip_epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Runs a closure against a snapshot view of the state.
    pub fn with_state<R>(&self, f: impl FnOnce(&MinerState) -> R) -> R {
        f(&self.state.lock())
    }

    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut MinerState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Takes the state lock directly, for multi-step operations that must
    /// stay atomic end to end.
    pub(crate) fn state_lock(&self) -> parking_lot::MutexGuard<'_, MinerState> {
        self.state.lock()
    }

    // -----------------------------------------------------------------------
    // Proof-of-work
    // -----------------------------------------------------------------------

    /// Searches for the next block, starting from nonce zero on the
    /// current tip.
    ///
    /// Every iteration rebuilds the candidate from the live unmined
    /// snapshot, so operations arriving mid-search are swept into the
    /// eventual block. The search aborts (`Interrupted`) as soon as the
    /// tip epoch moves, and a `nonce_budget` caps the number of attempts
    /// for cooperative scheduling and tests — `None` searches until it
    /// finds or is interrupted.
    ///
    /// The network applies the no-op difficulty to every block; see
    /// [`crate::chain::block`].
    pub fn mine_next(&self, nonce_budget: Option<u64>) -> MineOutcome {
        let difficulty = self.settings.pow_difficulty_no_op_block;
        let start_epoch = self.tip_epoch();
        let mut nonce: u32 = 0;
        let mut attempts: u64 = 0;

        loop {
            if self.tip_epoch() != start_epoch {
                return MineOutcome::Interrupted;
            }
            if let Some(budget) = nonce_budget {
                if attempts >= budget {
                    return MineOutcome::Exhausted;
                }
            }

            let candidate = {
                let state = self.state.lock();
                let prev_hash = state.blocks.tip().to_string();
                let block_no = state
                    .blocks
                    .tip_block()
                    .map(|b| b.block_no + 1)
                    .unwrap_or(1);
                Block {
                    block_no,
                    prev_hash,
                    records: state.ops.unmined_snapshot(),
                    pub_key_string: self.pub_key_string.clone(),
                    nonce,
                }
            };

            let hash = candidate.hash();
            if hash_meets_difficulty(&hash, difficulty) {
                let mut state = self.state.lock();
                // The tip may have moved between hashing and locking;
                // never commit a block onto a stale parent.
                if state.blocks.tip() != candidate.prev_hash {
                    return MineOutcome::Interrupted;
                }
                let outbound = self.commit_mined_block(&mut state, candidate.clone(), &hash);
                info!(
                    hash = %hash,
                    block_no = candidate.block_no,
                    ops = candidate.records.len(),
                    "mined block"
                );
                return MineOutcome::Mined { block: candidate, hash, outbound };
            }

            nonce = nonce.wrapping_add(1);
            attempts += 1;
        }
    }

    /// Commits a locally mined block: store and link it, advance the tip,
    /// apply its ink, move its operations unmined → unvalidated, and run
    /// the depth promotion sweep.
    fn commit_mined_block(
        &self,
        state: &mut MinerState,
        block: Block,
        hash: &str,
    ) -> Vec<Outbound> {
        state.blocks.insert(hash, block.clone());
        state.blocks.set_tip(hash);
        state.ledger.apply_block(
            &block,
            self.settings.ink_per_op_block,
            self.settings.ink_per_no_op_block,
        );
        for record in &block.records {
            state.ops.shift(Bucket::Unmined, Bucket::Unvalidated, &record.op_sig);
        }
        self.promote_unvalidated(state);
        self.bump_tip_epoch();

        vec![Outbound::Block { block, hash: hash.to_string() }]
    }

    // -----------------------------------------------------------------------
    // Chain head reconciliation
    // -----------------------------------------------------------------------

    /// Moves the canonical head from `old_tip` to `new_tip`, handling
    /// both fast-forward and branch switch.
    ///
    /// Walks both branches back to the most recent common ancestor, then:
    ///
    /// - reverses every abandoned block's ink (records and reward);
    /// - routes every abandoned operation: still referenced by the new
    ///   branch → handled by the replay below; otherwise back to unmined
    ///   for re-inclusion (validated ops included — stranding a validated
    ///   op would silently drop the shape);
    /// - replays the new branch oldest → newest, applying ink and routing
    ///   each operation to validated or unvalidated by its depth;
    /// - promotes any older unvalidated operation whose depth the new tip
    ///   now satisfies.
    ///
    /// Both hashes must name stored blocks connected to genesis.
    pub(crate) fn change_blockchain_head(
        &self,
        state: &mut MinerState,
        old_tip: &str,
        new_tip: &str,
    ) {
        let block_no_of = |state: &MinerState, hash: &str| {
            state.blocks.get(hash).map(|b| b.block_no).unwrap_or(0)
        };

        let mut new_branch: Vec<Block> = Vec::new();
        let mut old_branch: Vec<Block> = Vec::new();
        let mut new_branch_ops: HashSet<String> = HashSet::new();

        let mut new_cursor = new_tip.to_string();
        let mut old_cursor = old_tip.to_string();

        // Walk the new branch down to the old head's height.
        while block_no_of(state, &new_cursor) > block_no_of(state, &old_cursor) {
            let Some(block) = state.blocks.get(&new_cursor).cloned() else {
                warn!(hash = %new_cursor, "new branch walked off the block map");
                return;
            };
            for record in &block.records {
                new_branch_ops.insert(record.op_sig.clone());
            }
            new_cursor = block.prev_hash.clone();
            new_branch.push(block);
        }

        // Walk both branches in step until they meet at the common
        // ancestor. A fast-forward never enters this loop.
        while new_cursor != old_cursor {
            let (Some(new_block), Some(old_block)) = (
                state.blocks.get(&new_cursor).cloned(),
                state.blocks.get(&old_cursor).cloned(),
            ) else {
                warn!("branch walk left the block map before the common ancestor");
                return;
            };
            for record in &new_block.records {
                new_branch_ops.insert(record.op_sig.clone());
            }
            new_cursor = new_block.prev_hash.clone();
            old_cursor = old_block.prev_hash.clone();
            new_branch.push(new_block);
            old_branch.push(old_block);
        }

        // Abandon the old branch: reverse its ink block by block and
        // re-route its operations.
        for block in &old_branch {
            state.ledger.reverse_block(
                block,
                self.settings.ink_per_op_block,
                self.settings.ink_per_no_op_block,
            );
            for record in &block.records {
                let sig = &record.op_sig;
                let in_new_branch = new_branch_ops.contains(sig);
                let stranded = state
                    .ops
                    .remove(Bucket::Unvalidated, sig)
                    .or_else(|| state.ops.remove(Bucket::Validated, sig));
                if !in_new_branch {
                    let record = stranded.unwrap_or_else(|| record.clone());
                    state.ops.insert(Bucket::Unmined, record);
                }
            }
        }

        // Adopt the new branch oldest → newest.
        let new_tip_no = block_no_of(state, new_tip);
        for block in new_branch.iter().rev() {
            state.ledger.apply_block(
                block,
                self.settings.ink_per_op_block,
                self.settings.ink_per_no_op_block,
            );
            for record in &block.records {
                state.ops.remove(Bucket::Unmined, &record.op_sig);
                state.ops.remove(Bucket::Unvalidated, &record.op_sig);
                state.ops.remove(Bucket::Validated, &record.op_sig);
                let depth = new_tip_no - block.block_no;
                let bucket = if depth >= record.op.validate_num as u32 {
                    Bucket::Validated
                } else {
                    Bucket::Unvalidated
                };
                state.ops.insert(bucket, record.clone());
            }
        }

        state.blocks.set_tip(new_tip);
        self.promote_unvalidated(state);
        self.bump_tip_epoch();

        debug!(
            old = %old_tip,
            new = %new_tip,
            reversed = old_branch.len(),
            applied = new_branch.len(),
            "blockchain head moved"
        );
    }

    /// Promotes unvalidated operations whose containing block is now at
    /// least `validate_num` blocks under the tip.
    ///
    /// Runs after every tip move so an operation confirms as soon as the
    /// chain above it is deep enough, not only when a branch switch
    /// happens to walk past its block.
    fn promote_unvalidated(&self, state: &mut MinerState) {
        if state.ops.unvalidated.is_empty() {
            return;
        }
        let tip_no = state.blocks.tip_block().map(|b| b.block_no).unwrap_or(0);

        let mut promote: Vec<String> = Vec::new();
        for (_, block) in state.blocks.canonical_chain() {
            for record in &block.records {
                if let Some(pending) = state.ops.unvalidated.get(&record.op_sig) {
                    if tip_no - block.block_no >= pending.op.validate_num as u32 {
                        promote.push(record.op_sig.clone());
                    }
                }
            }
        }
        for sig in promote {
            state.ops.shift(Bucket::Unvalidated, Bucket::Validated, &sig);
        }
    }

    // -----------------------------------------------------------------------
    // Peer ingestion
    // -----------------------------------------------------------------------

    /// Handles a peer's `SendBlock`: validate, store, and re-arbitrate
    /// the chain head.
    ///
    /// Already-known blocks are acknowledged without effect and without
    /// re-gossip — that is what terminates dissemination loops. A longer
    /// chain always wins; an equal-length chain wins only with a
    /// lexicographically greater tip hash, so every miner breaks ties the
    /// same way.
    pub fn handle_send_block(
        &self,
        block: Block,
        claimed_hash: &str,
    ) -> Result<Vec<Outbound>, MinerError> {
        let mut state = self.state.lock();

        if state.blocks.contains(claimed_hash) {
            return Ok(Vec::new());
        }
        self.validate_block(&mut state, &block, claimed_hash)?;

        state.blocks.insert(claimed_hash, block.clone());

        let old_tip = state.blocks.tip().to_string();
        let new_len = state.blocks.chain_length(claimed_hash);
        let old_len = state.blocks.chain_length(&old_tip);

        if new_len > 0 && (new_len > old_len || (new_len == old_len && claimed_hash > old_tip.as_str())) {
            self.change_blockchain_head(&mut state, &old_tip, claimed_hash);
        }

        info!(hash = %claimed_hash, adopted = %(state.blocks.tip() == claimed_hash), "peer block accepted");
        Ok(vec![Outbound::Block { block, hash: claimed_hash.to_string() }])
    }

    /// Handles a peer's `SendOp`: verify the signature, dedup against the
    /// lifecycle buckets, enqueue, and re-gossip if new.
    ///
    /// Shape validity is deliberately not re-checked here; it is enforced
    /// when a block carrying the op is validated.
    pub fn handle_send_op(&self, record: crate::chain::OperationRecord) -> Result<Vec<Outbound>, MinerError> {
        if !record.verify_signature() {
            return Err(MinerError::InvalidSignature);
        }
        let mut state = self.state.lock();
        if state.ops.contains_lifecycle(&record.op_sig) {
            return Ok(Vec::new());
        }
        debug!(op_sig = %record.op_sig, "queueing gossiped op");
        state.ops.insert(Bucket::Unmined, record.clone());
        Ok(vec![Outbound::Op(record)])
    }

    // -----------------------------------------------------------------------
    // Chain exchange
    // -----------------------------------------------------------------------

    /// Snapshot of the canonical chain for `GetBlockChain`: the tip hash
    /// and every non-genesis block, newest first.
    pub fn chain_snapshot(&self) -> (String, Vec<Block>) {
        let state = self.state.lock();
        let tip = state.blocks.tip().to_string();
        let chain = state
            .blocks
            .canonical_chain()
            .into_iter()
            .map(|(_, b)| b.clone())
            .collect();
        (tip, chain)
    }

    /// Adopts a peer's chain snapshot at startup if it is valid and
    /// strictly longer than ours.
    ///
    /// `chain` is newest-first, as produced by [`Self::chain_snapshot`].
    /// Every block must hash into its successor's `prev_hash` (and the
    /// claimed tip), meet difficulty, carry only verifiable signatures,
    /// and the chain must bottom out at the genesis hash. Returns whether
    /// the snapshot became canonical.
    pub fn adopt_chain(&self, tip_hash: &str, chain: Vec<Block>) -> Result<bool, MinerError> {
        let difficulty = self.settings.pow_difficulty_no_op_block;
        let mut state = self.state.lock();

        let mut expected = tip_hash.to_string();
        for block in &chain {
            let computed = block.hash();
            if computed != expected {
                return Err(MinerError::Validation(expected));
            }
            if !hash_meets_difficulty(&computed, difficulty) {
                return Err(MinerError::Validation(computed));
            }
            for record in &block.records {
                if !record.verify_signature() {
                    return Err(MinerError::InvalidSignature);
                }
            }
            expected = block.prev_hash.clone();
        }
        if expected != state.blocks.genesis_hash() {
            return Err(MinerError::Validation(expected));
        }

        let old_tip = state.blocks.tip().to_string();
        if (chain.len() as u32) <= state.blocks.chain_length(&old_tip) {
            return Ok(false);
        }

        let mut hash = tip_hash.to_string();
        for block in &chain {
            let prev = block.prev_hash.clone();
            if !state.blocks.contains(&hash) {
                state.blocks.insert(&hash, block.clone());
            }
            hash = prev;
        }
        self.change_blockchain_head(&mut state, &old_tip, tip_hash);
        info!(tip = %tip_hash, length = chain.len(), "adopted peer chain");
        Ok(true)
    }
}
