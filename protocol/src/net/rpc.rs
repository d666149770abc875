//! # RPC Wire Types
//!
//! Type-safe request/response definitions for the two HTTP surfaces a
//! miner exposes. The axum server itself lives in the node binary; this
//! module only pins down the JSON shapes so both sides of every call
//! agree by construction.
//!
//! ## Peer RPC
//!
//! | Endpoint              | Description                                |
//! |-----------------------|--------------------------------------------|
//! | `send_block`          | Deliver a mined block and its hash         |
//! | `send_op`             | Deliver a signed operation record          |
//! | `get_blockchain`      | Fetch the tip hash and full chain snapshot |
//! | `ping`                | Liveness probe                             |
//! | `bidirectional_setup` | Exchange peer addresses after a dial       |
//!
//! ## Art-node API (token-gated)
//!
//! `hello` / `get_token` perform the nonce→token handshake; the rest
//! carry the token in the request body. Errors travel as a serialized
//! [`MinerError`] in an [`ErrorBody`] with a non-2xx status.

use serde::{Deserialize, Serialize};

use crate::chain::{Block, OperationRecord};
use crate::error::MinerError;
use crate::shape::ShapeType;

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: MinerError,
}

// ---------------------------------------------------------------------------
// Peer RPC
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendBlockRequest {
    pub block: Block,
    pub hash: String,
    /// Address the sender receives peer RPC on, so the receiver can
    /// gossip onward without echoing back.
    pub from: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOpRequest {
    pub record: OperationRecord,
    pub from: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBlockChainResponse {
    pub tip_hash: String,
    /// Canonical chain, newest first, genesis excluded.
    pub chain: Vec<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidirectionalSetupRequest {
    /// Address the dialing miner receives peer RPC on.
    pub address: String,
}

// ---------------------------------------------------------------------------
// Art-node API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloResponse {
    pub nonce: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTokenRequest {
    pub nonce: String,
    pub r: String,
    pub s: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTokenResponse {
    pub token: String,
    pub canvas_x_max: u32,
    pub canvas_y_max: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddShapeRequest {
    pub token: String,
    pub validate_num: u8,
    pub shape_type: ShapeType,
    pub svg: String,
    pub fill: String,
    pub stroke: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteShapeRequest {
    pub token: String,
    pub shape_hash: String,
    pub validate_num: u8,
}

/// Shared response for add and delete: the op's identity and the ink
/// balance as it will stand once the op is mined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpResponse {
    pub op_sig: String,
    pub ink_remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenOnlyRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeHashRequest {
    pub token: String,
    pub shape_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHashRequest {
    pub token: String,
    pub block_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvgStringResponse {
    pub svg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InkResponse {
    pub ink_remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisBlockResponse {
    pub block_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashListResponse {
    pub hashes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpValidatedResponse {
    pub validated: bool,
    pub block_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_block_roundtrip() {
        let req = SendBlockRequest {
            block: Block::genesis("miner"),
            hash: "abc".to_string(),
            from: Some("http://peer:8650".to_string()),
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: SendBlockRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hash, "abc");
        assert_eq!(back.block.block_no, 0);
    }

    #[test]
    fn error_body_carries_typed_error() {
        let body = ErrorBody { error: MinerError::InsufficientInk(3) };
        let json = serde_json::to_string(&body).unwrap();
        let back: ErrorBody = serde_json::from_str(&json).unwrap();
        assert_eq!(back.error, MinerError::InsufficientInk(3));
    }

    #[test]
    fn add_shape_request_shape_type_is_integer() {
        let req = AddShapeRequest {
            token: "t".to_string(),
            validate_num: 3,
            shape_type: ShapeType::Circle,
            svg: "X 1 Y 1 R 1".to_string(),
            fill: "red".to_string(),
            stroke: "red".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["shape_type"], 1);
    }
}
