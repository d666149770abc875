//! # Cryptographic Primitives
//!
//! Low-level crypto for the ink miner. Two concerns live here:
//!
//! - `keys.rs` — ECDSA P-256 keypairs. Every miner identity and every
//!   operation signature traces back to one of these.
//! - `hash.rs` — MD5 block hashing over canonical JSON. The proof-of-work
//!   target, not a security boundary: PoW needs a fast, well-distributed
//!   function with a stable string form, and the difficulty check runs on
//!   the hex digest.
//!
//! Nothing in this module does I/O and nothing here logs key material.

pub mod hash;
pub mod keys;

pub use hash::{canonical_json, md5_hex};
pub use keys::{MinerKeypair, MinerPublicKey, OpSignature};
