//! # Network Module
//!
//! The protocol side of the miner's networking. No sockets here — this
//! module decides *what* goes *where*, and the node binary moves the
//! bytes.
//!
//! ```text
//! gossip.rs — peer registry, fanout selection, dissemination planning
//! rpc.rs    — request/response wire types for the peer RPC and art API
//! ```

pub mod gossip;
pub mod rpc;

pub use gossip::{Dispatch, GossipConfig, GossipEngine, PeerInfo};
