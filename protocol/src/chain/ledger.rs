//! # Ink Ledger
//!
//! Per-owner ink accounts, keyed by public-key string. ADD operations
//! debit the owner, REMOVE operations credit back the original cost, and
//! miners earn a reward per block on the canonical chain.
//!
//! Balances are `u32` with wrapping arithmetic treated as signed-logical:
//! every debit on the canonical chain was validated against the balance
//! before it was accepted, and every reversal undoes an earlier
//! application, so wrap-around never surfaces on an honest chain. The
//! wrapping keeps apply and reverse exact inverses even mid-reorg, which
//! is what the ink-conservation property depends on.

use std::collections::HashMap;

use super::block::Block;
use super::operation::OpType;

/// The miner's view of everyone's ink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InkLedger {
    accounts: HashMap<String, u32>,
}

impl InkLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance for an owner; unknown owners hold zero.
    pub fn balance(&self, owner: &str) -> u32 {
        self.accounts.get(owner).copied().unwrap_or(0)
    }

    /// Number of accounts that have ever been touched.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn credit(&mut self, owner: &str, amount: u32) {
        let entry = self.accounts.entry(owner.to_string()).or_insert(0);
        *entry = entry.wrapping_add(amount);
    }

    fn debit(&mut self, owner: &str, amount: u32) {
        let entry = self.accounts.entry(owner.to_string()).or_insert(0);
        *entry = entry.wrapping_sub(amount);
    }

    /// Applies a block's ink effects: each op against its owner, then the
    /// mining reward to the block's miner.
    pub fn apply_block(&mut self, block: &Block, ink_per_op_block: u32, ink_per_no_op_block: u32) {
        for record in &block.records {
            match record.op.op_type {
                OpType::Add => self.debit(&record.pub_key_string, record.op.ink_cost),
                OpType::Remove => self.credit(&record.pub_key_string, record.op.ink_cost),
            }
        }
        let reward = if block.is_no_op() {
            ink_per_no_op_block
        } else {
            ink_per_op_block
        };
        self.credit(&block.pub_key_string, reward);
    }

    /// Exactly undoes [`apply_block`].
    pub fn reverse_block(
        &mut self,
        block: &Block,
        ink_per_op_block: u32,
        ink_per_no_op_block: u32,
    ) {
        for record in &block.records {
            match record.op.op_type {
                OpType::Add => self.credit(&record.pub_key_string, record.op.ink_cost),
                OpType::Remove => self.debit(&record.pub_key_string, record.op.ink_cost),
            }
        }
        let reward = if block.is_no_op() {
            ink_per_no_op_block
        } else {
            ink_per_op_block
        };
        self.debit(&block.pub_key_string, reward);
    }

    /// Reverses a single validated op outside any block context, used when
    /// a branch switch strands an op.
    pub fn reverse_op(&mut self, owner: &str, op_type: OpType, ink_cost: u32) {
        match op_type {
            OpType::Add => self.credit(owner, ink_cost),
            OpType::Remove => self.debit(owner, ink_cost),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::operation::{Operation, OperationRecord};
    use crate::shape::{Shape, ShapeType};

    fn record(owner: &str, op_type: OpType, ink_cost: u32) -> OperationRecord {
        OperationRecord {
            op: Operation {
                op_type,
                shape: Shape {
                    shape_type: ShapeType::Path,
                    svg: "M 0 0 h 1".to_string(),
                    fill: "transparent".to_string(),
                    stroke: "red".to_string(),
                    owner: owner.to_string(),
                },
                ink_cost,
                validate_num: 0,
                timestamp: 0,
            },
            op_sig: format!("sig-{owner}-{ink_cost}"),
            pub_key_string: owner.to_string(),
        }
    }

    fn block_with(records: Vec<OperationRecord>, miner: &str) -> Block {
        Block {
            block_no: 1,
            prev_hash: "p".to_string(),
            records,
            pub_key_string: miner.to_string(),
            nonce: 0,
        }
    }

    #[test]
    fn unknown_accounts_hold_zero() {
        let ledger = InkLedger::new();
        assert_eq!(ledger.balance("nobody"), 0);
    }

    #[test]
    fn no_op_block_pays_no_op_reward() {
        let mut ledger = InkLedger::new();
        ledger.apply_block(&block_with(vec![], "miner"), 50, 25);
        assert_eq!(ledger.balance("miner"), 25);
    }

    #[test]
    fn op_block_pays_op_reward_and_moves_ink() {
        let mut ledger = InkLedger::new();
        // Seed alice so the debit doesn't wrap below zero.
        ledger.apply_block(&block_with(vec![], "alice"), 50, 25);
        assert_eq!(ledger.balance("alice"), 25);

        let b = block_with(vec![record("alice", OpType::Add, 10)], "miner");
        ledger.apply_block(&b, 50, 25);
        assert_eq!(ledger.balance("alice"), 15);
        assert_eq!(ledger.balance("miner"), 50);
    }

    #[test]
    fn remove_refunds_the_carried_cost() {
        let mut ledger = InkLedger::new();
        let b = block_with(vec![record("alice", OpType::Remove, 10)], "miner");
        ledger.apply_block(&b, 50, 25);
        assert_eq!(ledger.balance("alice"), 10);
    }

    #[test]
    fn reverse_is_exact_inverse() {
        let mut ledger = InkLedger::new();
        ledger.apply_block(&block_with(vec![], "alice"), 50, 25);
        let snapshot = ledger.clone();

        let b = block_with(
            vec![
                record("alice", OpType::Add, 7),
                record("bob", OpType::Remove, 3),
            ],
            "miner",
        );
        ledger.apply_block(&b, 50, 25);
        assert_ne!(ledger, snapshot);

        ledger.reverse_block(&b, 50, 25);
        assert_eq!(ledger.balance("alice"), snapshot.balance("alice"));
        assert_eq!(ledger.balance("bob"), snapshot.balance("bob"));
        assert_eq!(ledger.balance("miner"), snapshot.balance("miner"));
    }

    #[test]
    fn conservation_across_many_blocks() {
        // Apply a pile of blocks, reverse them in reverse order, and land
        // exactly where we started.
        let mut ledger = InkLedger::new();
        let blocks: Vec<Block> = (0..5)
            .map(|i| {
                block_with(
                    vec![record("alice", OpType::Add, i), record("bob", OpType::Remove, i * 2)],
                    "miner",
                )
            })
            .collect();

        for b in &blocks {
            ledger.apply_block(b, 50, 25);
        }
        for b in blocks.iter().rev() {
            ledger.reverse_block(b, 50, 25);
        }
        assert_eq!(ledger.balance("alice"), 0);
        assert_eq!(ledger.balance("bob"), 0);
        assert_eq!(ledger.balance("miner"), 0);
    }

    #[test]
    fn reverse_op_mirrors_apply() {
        let mut ledger = InkLedger::new();
        let b = block_with(vec![record("alice", OpType::Add, 9)], "miner");
        ledger.apply_block(&b, 50, 25);
        ledger.reverse_op("alice", OpType::Add, 9);
        assert_eq!(ledger.balance("alice"), 0);
    }
}
