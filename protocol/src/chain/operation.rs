//! # Operations
//!
//! An operation is one ADD or REMOVE of a shape. Signed with the owner's
//! ECDSA key it becomes an [`OperationRecord`], and the signature string
//! doubles as the operation's identity everywhere: bucket keys, shape
//! hashes handed to art nodes, gossip dedup.
//!
//! ## Wire format
//!
//! The canonical JSON of an [`Operation`] (fields in declared order) is
//! the exact byte sequence that gets signed. Touch the field order and
//! every existing signature on the network stops verifying; consider that
//! before "cleaning up" this struct.

use chrono::Utc;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::crypto::{canonical_json, MinerKeypair, MinerPublicKey, OpSignature};
use crate::shape::Shape;

// ---------------------------------------------------------------------------
// OpType
// ---------------------------------------------------------------------------

/// Whether an operation places a shape or removes one.
///
/// Wire encoding is an integer: `0` ADD, `1` REMOVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    Add,
    Remove,
}

impl Serialize for OpType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            Self::Add => 0,
            Self::Remove => 1,
        })
    }
}

impl<'de> Deserialize<'de> for OpType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Add),
            1 => Ok(Self::Remove),
            other => Err(de::Error::custom(format!("unknown op type {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A single canvas operation, before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "Type")]
    pub op_type: OpType,

    #[serde(rename = "Shape")]
    pub shape: Shape,

    /// Ink this operation moves. ADD debits the owner; REMOVE credits the
    /// owner the original shape's cost back.
    #[serde(rename = "InkCost")]
    pub ink_cost: u32,

    /// Depth past the containing block at which the operation counts as
    /// validated toward its art node.
    #[serde(rename = "ValidateNum")]
    pub validate_num: u8,

    /// Nanoseconds since the Unix epoch at submission time. Keeps two
    /// otherwise-identical operations from colliding on one signature.
    #[serde(rename = "TimeStamp")]
    pub timestamp: i64,
}

impl Operation {
    /// Signs this operation, producing the record that travels the network.
    pub fn sign(self, keypair: &MinerKeypair) -> OperationRecord {
        let signature = keypair.sign(&canonical_json(&self));
        OperationRecord {
            op: self,
            op_sig: signature.to_sig_string(),
            pub_key_string: keypair.public_key_string(),
        }
    }
}

/// Current time in nanoseconds since the Unix epoch, for operation stamps.
pub fn timestamp_now_ns() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// OperationRecord
// ---------------------------------------------------------------------------

/// A signed operation: the op, its signature string, and the owner's
/// public-key string. The signature string is the record's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    #[serde(rename = "Op")]
    pub op: Operation,

    #[serde(rename = "OpSig")]
    pub op_sig: String,

    #[serde(rename = "PubKeyString")]
    pub pub_key_string: String,
}

impl OperationRecord {
    /// Verifies the embedded signature against the embedded owner key.
    ///
    /// False for any malformed key, malformed signature, or mismatch; a
    /// forged record never deserves a detailed error.
    pub fn verify_signature(&self) -> bool {
        let Ok(signature) = OpSignature::from_sig_string(&self.op_sig) else {
            return false;
        };
        let Ok(owner) = MinerPublicKey::from_hex(&self.pub_key_string) else {
            return false;
        };
        owner.verify(&canonical_json(&self.op), &signature)
    }
}
