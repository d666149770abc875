//! # Error Taxonomy
//!
//! Every error an ink miner can hand back over the wire, in one enum.
//! The variant names are the wire-level tags the art-node library matches
//! on, so renaming one is a protocol change, not a refactor.
//!
//! Core code returns these; it never panics on bad input. A malformed SVG
//! string, a broke artist, and a forged signature are all ordinary Tuesday
//! traffic, not exceptional conditions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MAX_SVG_STRING_LEN;

/// Errors surfaced by the miner core to peers and art nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MinerError {
    /// The shape SVG string could not be parsed, or a filled shape's
    /// polygon self-intersects.
    #[error("invalid shape svg string: {0}")]
    InvalidShapeSvgString(String),

    /// The shape SVG string exceeds [`MAX_SVG_STRING_LEN`] bytes.
    #[error("shape svg string longer than {MAX_SVG_STRING_LEN} bytes: {0}")]
    ShapeSvgStringTooLong(String),

    /// No shape with the given hash (operation signature) exists.
    #[error("invalid shape hash: {0}")]
    InvalidShapeHash(String),

    /// The shape belongs to a different miner key.
    #[error("shape owned by another miner: {0}")]
    ShapeOwner(String),

    /// A vertex, or part of a circle, lies outside the canvas.
    #[error("shape is out of canvas bounds")]
    OutOfBounds,

    /// The shape geometrically overlaps another owner's shape. Carries the
    /// hash of the overlapped shape.
    #[error("shape overlaps existing shape: {0}")]
    ShapeOverlap(String),

    /// The fill/stroke combination is not drawable (empty, or both
    /// transparent).
    #[error("invalid shape fill/stroke: {0}")]
    InvalidShapeFillStroke(String),

    /// The owner does not have enough ink. Carries the current balance.
    #[error("insufficient ink: {0} remaining")]
    InsufficientInk(u32),

    /// No block with the given hash exists.
    #[error("invalid block hash: {0}")]
    InvalidBlockHash(String),

    /// A peer could not be reached.
    #[error("disconnected from {0}")]
    Disconnected(String),

    /// An ECDSA signature failed verification.
    #[error("invalid signature")]
    InvalidSignature,

    /// The art-node token is unknown or expired.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// A peer-delivered block failed validation. Carries the claimed hash.
    #[error("block failed validation: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_roundtrip_as_json() {
        let errs = vec![
            MinerError::ShapeOverlap("abcd".into()),
            MinerError::InsufficientInk(17),
            MinerError::OutOfBounds,
            MinerError::InvalidSignature,
        ];
        for e in errs {
            let json = serde_json::to_string(&e).unwrap();
            let back: MinerError = serde_json::from_str(&json).unwrap();
            assert_eq!(e, back);
        }
    }

    #[test]
    fn display_carries_payload() {
        let e = MinerError::InsufficientInk(42);
        assert!(e.to_string().contains("42"));

        let e = MinerError::ShapeOverlap("deadbeef".into());
        assert!(e.to_string().contains("deadbeef"));
    }
}
