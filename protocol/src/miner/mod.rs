//! # Miner Engine
//!
//! The active half of the ink miner: proof-of-work mining, operation
//! lifecycle management, branch arbitration, and the art-node surface.
//!
//! ```text
//! state.rs    — the single shared state container (one lock)
//! engine.rs   — PoW loop, commit, branch switching, peer ingestion
//! validate.rs — shape validation against miner state, block validation
//! artnode.rs  — token-gated operations art nodes call
//! ```
//!
//! ## Concurrency contract
//!
//! All mutable state lives in one [`state::MinerState`] behind one
//! `parking_lot::Mutex`. Handlers and the mining loop take the lock for
//! short, bounded sections; the mining loop itself never holds it across
//! a hash attempt. Tip changes bump an atomic epoch counter, which is the
//! only signal the mining loop polls — cancellation is at nonce
//! granularity and no partially validated block ever commits.
//!
//! The engine performs no I/O. Anything that must reach the network is
//! handed back as [`Outbound`] values for the node runtime to disseminate.

pub mod artnode;
pub mod engine;
pub mod state;
pub mod validate;

pub use engine::{MineOutcome, Miner};
pub use state::MinerState;

use crate::chain::{Block, OperationRecord};

/// A message the node runtime should disseminate to peers after the
/// engine returns. The engine decides *what* spreads; the gossip layer
/// decides *where*.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A block worth announcing, with its hash.
    Block { block: Block, hash: String },
    /// An operation record worth forwarding.
    Op(OperationRecord),
}

/// Result of submitting an operation on behalf of an art node.
#[derive(Debug, Clone)]
pub struct OpSubmission {
    /// The operation's signature string — the shape hash art nodes track.
    pub op_sig: String,
    /// The owner's ink balance as it will stand once the op is mined.
    pub ink_remaining: u32,
    /// Gossip for the node runtime to send.
    pub outbound: Vec<Outbound>,
}
