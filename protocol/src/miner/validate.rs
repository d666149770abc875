//! # Miner-Side Validation
//!
//! The two validation entry points the engine runs under its state lock:
//!
//! - [`Miner::validate_new_shape`] — the gatekeeper for a shape trying
//!   to enter the canvas: grammar, bounds, self-intersection, the owner's
//!   ink balance, and overlap against every operation in flight or
//!   committed.
//! - [`Miner::validate_block`] — everything a peer block must prove
//!   before it is stored: hash integrity, proof-of-work, a known parent,
//!   a valid signature on every record, and shape validity for every ADD
//!   with the block's own records staged in the temp bucket so the block
//!   is checked for internal consistency too.
//!
//! Validation never mutates lifecycle buckets; the temp bucket is cleared
//! on every exit path.

use tracing::{debug, warn};

use super::engine::Miner;
use super::state::MinerState;
use crate::chain::block::hash_meets_difficulty;
use crate::chain::ops::Bucket;
use crate::chain::{Block, OpType};
use crate::error::MinerError;
use crate::shape::{self, Geometry, Shape};

impl Miner {
    /// Validates a shape against the canvas and the current miner state,
    /// returning its ink cost.
    ///
    /// Check order: geometry (parse, fill rules, bounds,
    /// self-intersection), then the owner's ink balance, then overlap
    /// against all four operation buckets. Records owned by the shape's
    /// own key are exempt from the overlap check — an owner may stack
    /// their own shapes freely.
    pub(crate) fn validate_new_shape(
        &self,
        state: &MinerState,
        shape: &Shape,
    ) -> Result<u64, MinerError> {
        let canvas = self.settings().canvas_settings;
        let geometry = shape.validate(canvas.canvas_x_max, canvas.canvas_y_max)?;

        let cost = shape::ink_cost(&geometry);
        let balance = state.ledger.balance(&shape.owner) as u64;
        if cost > balance {
            return Err(MinerError::InsufficientInk(balance as u32));
        }

        if let Some(other) = self.find_overlap(state, shape, &geometry) {
            return Err(MinerError::ShapeOverlap(other));
        }
        Ok(cost)
    }

    /// Scans every bucket for a differently-owned record whose geometry
    /// overlaps the candidate. Returns the first offender's signature.
    fn find_overlap(&self, state: &MinerState, shape: &Shape, geometry: &Geometry) -> Option<String> {
        for (sig, record) in state.ops.iter_all() {
            if record.op.shape.owner == shape.owner {
                continue;
            }
            // Records in the buckets were validated on entry, so their
            // geometry parses; anything that doesn't is skipped rather
            // than trusted.
            match record.op.shape.geometry() {
                Ok(other) => {
                    if shape::has_overlap(&other, geometry) {
                        return Some(sig.clone());
                    }
                }
                Err(err) => {
                    warn!(op_sig = %sig, error = %err, "unparseable shape in bucket, skipping");
                }
            }
        }
        None
    }

    /// Validates a peer-delivered block against the claimed hash and the
    /// current miner state.
    ///
    /// The block's own records are staged into the temp bucket as they
    /// are checked, so later records overlap-check against earlier ones.
    /// The temp bucket is cleared whatever the outcome.
    pub(crate) fn validate_block(
        &self,
        state: &mut MinerState,
        block: &Block,
        claimed_hash: &str,
    ) -> Result<(), MinerError> {
        let computed = block.hash();
        if computed != claimed_hash {
            debug!(claimed = %claimed_hash, computed = %computed, "block hash mismatch");
            return Err(MinerError::Validation(claimed_hash.to_string()));
        }
        if !hash_meets_difficulty(claimed_hash, self.settings().pow_difficulty_no_op_block) {
            debug!(hash = %claimed_hash, "block hash fails proof-of-work difficulty");
            return Err(MinerError::Validation(claimed_hash.to_string()));
        }
        if !state.blocks.contains(&block.prev_hash) {
            debug!(prev = %block.prev_hash, "block parent unknown");
            return Err(MinerError::Validation(claimed_hash.to_string()));
        }

        let result = self.validate_block_records(state, block);
        state.ops.clear_temp();
        result
    }

    fn validate_block_records(
        &self,
        state: &mut MinerState,
        block: &Block,
    ) -> Result<(), MinerError> {
        for record in &block.records {
            if !record.verify_signature() {
                debug!(op_sig = %record.op_sig, "record signature invalid");
                return Err(MinerError::InvalidSignature);
            }
            // Stage first: the same-owner exemption keeps a record from
            // tripping over itself, while differently-owned records in
            // the same block are checked against each other.
            state.ops.insert(Bucket::Temp, record.clone());

            // REMOVE records re-reference a shape that already passed
            // validation when it was added; only ADDs face the gauntlet.
            if record.op.op_type == OpType::Add {
                self.validate_new_shape(state, &record.op.shape)?;
            }
        }
        Ok(())
    }
}
