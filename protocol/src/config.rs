//! # Protocol Configuration & Constants
//!
//! Every magic number in BlockArt lives here, alongside the settings record
//! the directory server hands out at registration time. If you're hardcoding
//! a constant somewhere else, you're doing it wrong and you owe the team
//! coffee.
//!
//! Settings that affect consensus (difficulty, ink rewards, canvas size)
//! come from the directory server so that every miner on a network agrees.
//! The constants below are local defaults and hard protocol limits.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Limits
// ---------------------------------------------------------------------------

/// Maximum accepted length of a shape SVG string, in bytes.
/// Long enough for any reasonable drawing command sequence, short enough
/// that nobody smuggles a novel into the chain.
pub const MAX_SVG_STRING_LEN: usize = 128;

/// Length in characters of the hex nonce/token strings used for art-node
/// authentication. 64 hex chars = 256 bits.
pub const AUTH_TOKEN_LEN: usize = 64;

/// Maximum number of entries the gossip seen-cache will hold before
/// evicting the oldest half.
pub const GOSSIP_SEEN_CACHE_SIZE: usize = 100_000;

/// Number of peers each gossip message is forwarded to.
pub const GOSSIP_FANOUT: usize = 8;

// ---------------------------------------------------------------------------
// Default Network Parameters
// ---------------------------------------------------------------------------

/// Default peer RPC port.
pub const DEFAULT_RPC_PORT: u16 = 8650;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 8651;

/// Milliseconds shaved off the server heartbeat interval so that a beat is
/// always in flight before the server's timeout fires.
pub const HEARTBEAT_TIME_BUFFER_MS: u64 = 500;

// ---------------------------------------------------------------------------
// Canvas Settings
// ---------------------------------------------------------------------------

/// Dimensions of the shared canvas.
///
/// Shapes live on the integer grid `[0, canvas_x_max] x [0, canvas_y_max]`.
/// Anything outside is rejected with `OutOfBounds` before it costs anyone
/// a drop of ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSettings {
    /// Maximum x coordinate (inclusive).
    #[serde(rename = "CanvasXMax")]
    pub canvas_x_max: u32,
    /// Maximum y coordinate (inclusive).
    #[serde(rename = "CanvasYMax")]
    pub canvas_y_max: u32,
}

// ---------------------------------------------------------------------------
// Miner Network Settings
// ---------------------------------------------------------------------------

/// Settings for an instance of the BlockArt network, as delivered by the
/// directory server when a miner registers.
///
/// These values are consensus-critical: two miners with different settings
/// are, for all practical purposes, on different networks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerNetSettings {
    /// Hash under which the very first (empty) block is stored. The genesis
    /// block's hash is assigned by the network, not computed from content.
    #[serde(rename = "GenesisBlockHash")]
    pub genesis_block_hash: String,

    /// The minimum number of peer miners a miner should stay connected to.
    /// Below this, it asks the directory server for more addresses.
    #[serde(rename = "MinNumMinerConnections")]
    pub min_num_miner_connections: u8,

    /// Ink reward for mining a block that carries at least one operation.
    #[serde(rename = "InkPerOpBlock")]
    pub ink_per_op_block: u32,

    /// Ink reward for mining an empty (no-op) block.
    #[serde(rename = "InkPerNoOpBlock")]
    pub ink_per_no_op_block: u32,

    /// Milliseconds between heartbeat messages to the directory server.
    #[serde(rename = "HeartBeat")]
    pub heartbeat_ms: u32,

    /// Proof-of-work difficulty for op blocks: required count of trailing
    /// zero characters on the hex block hash.
    ///
    /// Currently unused: the network applies the no-op difficulty to every
    /// block (see [`crate::chain::block`]). Kept for wire compatibility.
    #[serde(rename = "PoWDifficultyOpBlock")]
    pub pow_difficulty_op_block: u8,

    /// Proof-of-work difficulty for no-op blocks. In the current network
    /// this difficulty is applied to every block regardless of content.
    #[serde(rename = "PoWDifficultyNoOpBlock")]
    pub pow_difficulty_no_op_block: u8,

    /// Canvas dimensions.
    #[serde(rename = "CanvasSettings")]
    pub canvas_settings: CanvasSettings,
}

impl MinerNetSettings {
    /// Devnet defaults for running a miner without a directory server.
    ///
    /// Difficulty 2 mines in well under a second on anything built this
    /// decade, which is the point: devnet is for watching shapes appear,
    /// not for burning CPUs.
    pub fn devnet() -> Self {
        Self {
            genesis_block_hash: "83218ac34c1834c26781fe4bde918ee4".to_string(),
            min_num_miner_connections: 3,
            ink_per_op_block: 50,
            ink_per_no_op_block: 25,
            heartbeat_ms: 2_000,
            pow_difficulty_op_block: 5,
            pow_difficulty_no_op_block: 2,
            canvas_settings: CanvasSettings {
                canvas_x_max: 1024,
                canvas_y_max: 1024,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devnet_settings_are_sane() {
        let s = MinerNetSettings::devnet();
        assert!(s.ink_per_op_block >= s.ink_per_no_op_block);
        assert!(s.canvas_settings.canvas_x_max > 0);
        assert!(s.canvas_settings.canvas_y_max > 0);
        assert_eq!(s.genesis_block_hash.len(), 32);
    }

    #[test]
    fn settings_wire_field_names() {
        // The directory server speaks exported-Go-field JSON. If these names
        // drift, registration breaks silently — so pin them.
        let s = MinerNetSettings::devnet();
        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("GenesisBlockHash").is_some());
        assert!(json.get("PoWDifficultyNoOpBlock").is_some());
        assert!(json["CanvasSettings"].get("CanvasXMax").is_some());
    }

    #[test]
    fn settings_roundtrip() {
        let s = MinerNetSettings::devnet();
        let json = serde_json::to_string(&s).unwrap();
        let back: MinerNetSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
