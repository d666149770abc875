//! # Blocks
//!
//! The unit of proof-of-work. A block binds a batch of operation records
//! to a parent hash and a nonce; its identity is the lowercase hex MD5 of
//! its canonical JSON, and the mining race is over the trailing-zero count
//! of that hex string.
//!
//! ## Hash discipline
//!
//! The canonical JSON field order is `BlockNo, PrevHash, Records,
//! PubKeyString, Nonce` — declaration order below. Reordering the struct
//! fields changes every block hash on the network.
//!
//! ## Difficulty
//!
//! A hash "meets difficulty D" when it ends in D `'0'` characters —
//! trailing, not the leading-zero convention most chains use. The network
//! applies the *no-op* difficulty to every block, op-carrying or not; the
//! op-block difficulty setting exists in the wire format but is not
//! consulted. Preserved as-is for interoperability.

use serde::{Deserialize, Serialize};

use super::operation::OperationRecord;
use crate::crypto::{canonical_json, md5_hex};

/// A BlockArt block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "BlockNo")]
    pub block_no: u32,

    /// Hash of the parent block. Empty only for genesis.
    #[serde(rename = "PrevHash")]
    pub prev_hash: String,

    /// Operation records mined into this block. Empty for a no-op block.
    #[serde(rename = "Records")]
    pub records: Vec<OperationRecord>,

    /// Public-key string of the miner that found this block; the ink
    /// reward lands on this account.
    #[serde(rename = "PubKeyString")]
    pub pub_key_string: String,

    #[serde(rename = "Nonce")]
    pub nonce: u32,
}

impl Block {
    /// The genesis block: number 0, no parent, no records, nonce 0.
    ///
    /// Genesis is special-cased throughout: it is stored under the
    /// network-assigned genesis hash from the directory server, not under
    /// its content hash.
    pub fn genesis(miner_pub_key: &str) -> Self {
        Self {
            block_no: 0,
            prev_hash: String::new(),
            records: Vec::new(),
            pub_key_string: miner_pub_key.to_string(),
            nonce: 0,
        }
    }

    /// Computes this block's hash: lowercase hex MD5 of canonical JSON.
    pub fn hash(&self) -> String {
        md5_hex(&canonical_json(self))
    }

    /// True when the block carries no operations (a no-op block).
    pub fn is_no_op(&self) -> bool {
        self.records.is_empty()
    }
}

/// True when `hash` ends in at least `difficulty` `'0'` characters.
pub fn hash_meets_difficulty(hash: &str, difficulty: u8) -> bool {
    hash.bytes().rev().take(difficulty as usize).all(|b| b == b'0')
        && hash.len() >= difficulty as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_block(nonce: u32) -> Block {
        Block {
            block_no: 1,
            prev_hash: "00000000000000000000000000000000".to_string(),
            records: Vec::new(),
            pub_key_string: "miner-key".to_string(),
            nonce,
        }
    }

    #[test]
    fn genesis_shape() {
        let g = Block::genesis("miner-key");
        assert_eq!(g.block_no, 0);
        assert!(g.prev_hash.is_empty());
        assert!(g.records.is_empty());
        assert_eq!(g.nonce, 0);
        assert!(g.is_no_op());
    }

    #[test]
    fn hash_is_stable_and_lowercase() {
        let b = test_block(7);
        let h1 = b.hash();
        let h2 = b.hash();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 32);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn nonce_changes_hash() {
        assert_ne!(test_block(1).hash(), test_block(2).hash());
    }

    #[test]
    fn canonical_field_order() {
        let b = test_block(0);
        let json = String::from_utf8(canonical_json(&b)).unwrap();
        let order = [
            json.find("\"BlockNo\"").unwrap(),
            json.find("\"PrevHash\"").unwrap(),
            json.find("\"Records\"").unwrap(),
            json.find("\"PubKeyString\"").unwrap(),
            json.find("\"Nonce\"").unwrap(),
        ];
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn difficulty_counts_trailing_zeros() {
        assert!(hash_meets_difficulty("ab00", 2));
        assert!(hash_meets_difficulty("ab00", 1));
        assert!(!hash_meets_difficulty("ab00", 3));
        // Leading zeros do not count.
        assert!(!hash_meets_difficulty("00ab", 1));
        // Difficulty zero accepts everything.
        assert!(hash_meets_difficulty("abcd", 0));
    }
}
