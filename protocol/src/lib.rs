// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # BlockArt Protocol — Core Library
//!
//! The beating heart of a BlockArt ink miner: a proof-of-work blockchain
//! whose payload is not money but *drawings*. Participants spend "ink" to
//! place vector shapes on a shared canvas, earn ink by mining blocks, and
//! rely on the chain to arbitrate which shapes actually made it.
//!
//! BlockArt takes a pragmatic stance: ECDSA P-256 for operation signatures
//! (the directory server speaks x509, so we do too), MD5 for block hashes
//! (proof-of-work needs a fast, stable target — not collision resistance),
//! and canonical JSON for every wire object (debuggable with `curl` and a
//! pair of eyes).
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of an
//! ink miner:
//!
//! - **shape** — The geometry engine. SVG parsing, ink costing, overlap
//!   detection. Pure and deterministic; no I/O, no floats on the hot path.
//! - **chain** — Blocks, operations, the block arena, and the ink ledger.
//! - **miner** — The state machine: PoW mining, the operation lifecycle,
//!   branch switching, validation.
//! - **net** — Gossip dissemination and RPC wire types. The HTTP server
//!   itself lives in the node binary.
//! - **crypto** — Keypairs, signatures, block hashing. Don't roll your own.
//! - **config** — Protocol constants and the directory-server settings.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over performance (a canvas is not a DEX).
//! 2. Geometry is integer arithmetic all the way down. Floats round;
//!    consensus can't.
//! 3. Every state mutation goes through one lock. Finer grains are an
//!    optimization we will take only with a proof of equivalence.
//! 4. If it touches ink, it has tests. Plural.

pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod miner;
pub mod net;
pub mod shape;
