//! # Block Store
//!
//! The owning arena for every block this miner has accepted, plus the
//! parent→child index and the tip pointer.
//!
//! Blocks are stored by hash string and refer to each other only by hash
//! string — children lists never hold block data. That breaks the
//! reference cycle a doubly-linked block tree would otherwise create and
//! makes pruning a non-event.
//!
//! The genesis block is stored under the network-assigned genesis hash
//! (its content hash is irrelevant), with an empty `prev_hash`.

use std::collections::HashMap;

use super::block::Block;

/// Arena of blocks, child index, and the current longest-chain tip.
#[derive(Debug, Clone)]
pub struct BlockStore {
    genesis_hash: String,
    blocks: HashMap<String, Block>,
    children: HashMap<String, Vec<String>>,
    tip: String,
}

impl BlockStore {
    /// Creates a store seeded with the genesis block under the
    /// network-assigned hash. The tip starts at genesis.
    pub fn new(genesis_hash: &str, genesis_block: Block) -> Self {
        let mut blocks = HashMap::new();
        blocks.insert(genesis_hash.to_string(), genesis_block);
        Self {
            genesis_hash: genesis_hash.to_string(),
            blocks,
            children: HashMap::new(),
            tip: genesis_hash.to_string(),
        }
    }

    pub fn genesis_hash(&self) -> &str {
        &self.genesis_hash
    }

    pub fn tip(&self) -> &str {
        &self.tip
    }

    pub fn set_tip(&mut self, hash: &str) {
        self.tip = hash.to_string();
    }

    /// The block currently at the tip. The tip always points at a stored
    /// block, so a miss here is a broken invariant, surfaced as `None`
    /// rather than a panic.
    pub fn tip_block(&self) -> Option<&Block> {
        self.blocks.get(&self.tip)
    }

    pub fn get(&self, hash: &str) -> Option<&Block> {
        self.blocks.get(hash)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.blocks.contains_key(hash)
    }

    /// Inserts a block under its hash and links it into its parent's
    /// child list.
    pub fn insert(&mut self, hash: &str, block: Block) {
        self.children
            .entry(block.prev_hash.clone())
            .or_default()
            .push(hash.to_string());
        self.blocks.insert(hash.to_string(), block);
    }

    /// Child hashes of a block, if the block has ever had a child.
    pub fn children(&self, hash: &str) -> Option<&[String]> {
        self.children.get(hash).map(|v| v.as_slice())
    }

    /// Length of the chain ending at `hash`, counted in non-genesis
    /// blocks. A chain that does not reach genesis is worth nothing.
    pub fn chain_length(&self, hash: &str) -> u32 {
        let mut length = 0u32;
        let mut current = hash;
        loop {
            if current == self.genesis_hash {
                return length;
            }
            match self.blocks.get(current) {
                Some(block) => {
                    length += 1;
                    current = &block.prev_hash;
                }
                None => return 0,
            }
        }
    }

    /// Walks the canonical chain from the tip down to (but excluding)
    /// genesis, newest first.
    pub fn canonical_chain(&self) -> Vec<(String, &Block)> {
        let mut out = Vec::new();
        let mut current = self.tip.clone();
        while current != self.genesis_hash {
            match self.blocks.get(&current) {
                Some(block) => {
                    let prev = block.prev_hash.clone();
                    out.push((current, block));
                    current = prev;
                }
                None => break,
            }
        }
        out
    }

    /// Finds the canonical-chain block containing an operation signature.
    pub fn find_record(&self, op_sig: &str) -> Option<(String, &Block)> {
        self.canonical_chain()
            .into_iter()
            .find(|(_, block)| block.records.iter().any(|r| r.op_sig == op_sig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: &str = "genesis-hash";

    fn store() -> BlockStore {
        BlockStore::new(GENESIS, Block::genesis("miner"))
    }

    fn child_of(prev: &str, block_no: u32, nonce: u32) -> (String, Block) {
        let block = Block {
            block_no,
            prev_hash: prev.to_string(),
            records: Vec::new(),
            pub_key_string: "miner".to_string(),
            nonce,
        };
        (block.hash(), block)
    }

    #[test]
    fn starts_at_genesis() {
        let s = store();
        assert_eq!(s.tip(), GENESIS);
        assert_eq!(s.chain_length(GENESIS), 0);
        assert!(s.get(GENESIS).is_some());
    }

    #[test]
    fn insert_links_children() {
        let mut s = store();
        let (h1, b1) = child_of(GENESIS, 1, 1);
        let (h2, b2) = child_of(GENESIS, 1, 2);
        s.insert(&h1, b1);
        s.insert(&h2, b2);

        let kids = s.children(GENESIS).unwrap();
        assert_eq!(kids.len(), 2);
        assert!(kids.contains(&h1));
        assert!(kids.contains(&h2));
    }

    #[test]
    fn chain_length_counts_to_genesis() {
        let mut s = store();
        let (h1, b1) = child_of(GENESIS, 1, 1);
        s.insert(&h1, b1);
        let (h2, b2) = child_of(&h1, 2, 1);
        s.insert(&h2, b2);

        assert_eq!(s.chain_length(&h1), 1);
        assert_eq!(s.chain_length(&h2), 2);
    }

    #[test]
    fn disconnected_chain_has_zero_length() {
        let mut s = store();
        let (h, b) = child_of("unknown-parent", 5, 1);
        s.insert(&h, b);
        assert_eq!(s.chain_length(&h), 0);
    }

    #[test]
    fn canonical_chain_is_newest_first() {
        let mut s = store();
        let (h1, b1) = child_of(GENESIS, 1, 1);
        s.insert(&h1, b1);
        let (h2, b2) = child_of(&h1, 2, 1);
        s.insert(&h2, b2);
        s.set_tip(&h2);

        let chain = s.canonical_chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].0, h2);
        assert_eq!(chain[1].0, h1);
    }

    #[test]
    fn canonical_chain_at_genesis_is_empty() {
        assert!(store().canonical_chain().is_empty());
    }
}
