//! End-to-end integration tests for the BlockArt protocol.
//!
//! These exercise the full canvas lifecycle from key generation through
//! shape validation: token handshake, shape submission, mining,
//! confirmation depth, deletion with refund, and multi-miner convergence
//! over block exchange.
//!
//! Each test stands alone with its own miners and keys. No shared state,
//! no ordering dependencies, no flaky failures. Proof-of-work difficulty
//! is zero so "mining" is instant and deterministic in test time.

use blockart_protocol::config::{CanvasSettings, MinerNetSettings};
use blockart_protocol::crypto::MinerKeypair;
use blockart_protocol::error::MinerError;
use blockart_protocol::miner::{MineOutcome, Miner};
use blockart_protocol::shape::ShapeType;

fn test_settings() -> MinerNetSettings {
    MinerNetSettings {
        genesis_block_hash: "83218ac34c1834c26781fe4bde918ee4".to_string(),
        min_num_miner_connections: 1,
        ink_per_op_block: 50,
        ink_per_no_op_block: 25,
        heartbeat_ms: 1_000,
        pow_difficulty_op_block: 0,
        pow_difficulty_no_op_block: 0,
        canvas_settings: CanvasSettings { canvas_x_max: 1024, canvas_y_max: 1024 },
    }
}

/// A miner plus a copy of its keypair, so tests can play the art node.
fn spawn_miner() -> (Miner, MinerKeypair) {
    let keypair = MinerKeypair::generate();
    (Miner::new(test_settings(), keypair.clone()), keypair)
}

fn mine_one(m: &Miner) -> (blockart_protocol::chain::Block, String) {
    match m.mine_next(Some(100_000)) {
        MineOutcome::Mined { block, hash, .. } => (block, hash),
        other => panic!("expected mined block, got {other:?}"),
    }
}

fn authenticate(m: &Miner, keypair: &MinerKeypair) -> String {
    let nonce = m.hello();
    let sig = keypair.sign(nonce.as_bytes());
    let (token, x_max, y_max) = m.get_token(&nonce, &sig.r, &sig.s).expect("handshake");
    assert_eq!((x_max, y_max), (1024, 1024));
    token
}

// ---------------------------------------------------------------------------
// 1. Full shape lifecycle on a single miner
// ---------------------------------------------------------------------------

#[test]
fn full_shape_lifecycle() {
    let (miner, keypair) = spawn_miner();
    let token = authenticate(&miner, &keypair);

    // Earn ink.
    mine_one(&miner);
    assert_eq!(miner.get_ink(&token).unwrap(), 25);

    // Submit a line: √50 rounds up to 8 ink.
    let submission = miner
        .add_shape(&token, 1, ShapeType::Path, "M 10 10 L 5 5", "transparent", "red")
        .expect("valid shape");
    assert_eq!(submission.ink_remaining, 17);

    // Not yet on chain.
    let (validated, _) = miner.op_validated(&token, &submission.op_sig).unwrap();
    assert!(!validated);

    // Mine it in, then one more for the confirmation depth.
    mine_one(&miner);
    mine_one(&miner);

    let (validated, block_hash) = miner.op_validated(&token, &submission.op_sig).unwrap();
    assert!(validated);
    assert!(!block_hash.is_empty());

    // The shape is queryable and the block lists it.
    let svg = miner.get_svg_string(&token, &submission.op_sig).unwrap();
    assert!(svg.contains("M 10 10 L 5 5"));
    let shapes = miner.get_shapes(&token, &block_hash).unwrap();
    assert!(shapes.contains(&submission.op_sig));

    // Ledger: no-op reward + op reward + no-op reward − cost.
    assert_eq!(miner.get_ink(&token).unwrap(), 25 + 50 + 25 - 8);
}

// ---------------------------------------------------------------------------
// 2. Delete refunds the original cost
// ---------------------------------------------------------------------------

#[test]
fn delete_shape_refunds() {
    let (miner, keypair) = spawn_miner();
    let token = authenticate(&miner, &keypair);

    mine_one(&miner);
    let added = miner
        .add_shape(&token, 1, ShapeType::Path, "M 10 10 L 5 5", "transparent", "red")
        .unwrap();
    mine_one(&miner);
    mine_one(&miner);

    let before = miner.get_ink(&token).unwrap();
    let removed = miner.delete_shape(&token, &added.op_sig, 1).unwrap();
    assert_eq!(removed.ink_remaining, before + 8);

    // Mining the REMOVE realizes the refund on the ledger.
    mine_one(&miner);
    assert_eq!(miner.get_ink(&token).unwrap(), before + 8 + 50);
}

// ---------------------------------------------------------------------------
// 3. Two miners converge over block exchange
// ---------------------------------------------------------------------------

#[test]
fn two_miners_converge() {
    let (alice, alice_keys) = spawn_miner();
    let (bob, _) = spawn_miner();
    let token = authenticate(&alice, &alice_keys);

    mine_one(&alice);
    let submission = alice
        .add_shape(&token, 1, ShapeType::Path, "M 10 10 L 5 5", "transparent", "red")
        .unwrap();

    // Gossip the op, then relay every block alice mines.
    for outbound in submission.outbound {
        if let blockart_protocol::miner::Outbound::Op(record) = outbound {
            bob.handle_send_op(record).unwrap();
        }
    }
    // Bob hasn't seen alice's first block; send the whole history.
    let (tip, chain) = alice.chain_snapshot();
    bob.adopt_chain(&tip, chain).unwrap();

    for _ in 0..2 {
        let (block, hash) = mine_one(&alice);
        bob.handle_send_block(block, &hash).unwrap();
    }

    // Same tip, same ledger, same verdict on the op.
    assert_eq!(alice.chain_snapshot().0, bob.chain_snapshot().0);
    let alice_balance =
        alice.with_state(|s| s.ledger.balance(alice.public_key_string()));
    let bob_view = bob.with_state(|s| s.ledger.balance(alice.public_key_string()));
    assert_eq!(alice_balance, bob_view);
    bob.with_state(|s| assert!(s.ops.validated.contains_key(&submission.op_sig)));
}

// ---------------------------------------------------------------------------
// 4. Tip determinism under delivery reordering
// ---------------------------------------------------------------------------

#[test]
fn tip_is_deterministic_across_delivery_orders() {
    // One producer builds two competing branches; two observers receive
    // the blocks in opposite orders and must land on the same tip.
    let (producer, _) = spawn_miner();
    let genesis = producer.settings().genesis_block_hash.clone();

    let branch = |nonce_base: u32, length: u32| {
        let mut blocks = Vec::new();
        let mut prev = genesis.clone();
        for block_no in 1..=length {
            let b = blockart_protocol::chain::Block {
                block_no,
                prev_hash: prev.clone(),
                records: vec![],
                pub_key_string: producer.public_key_string().to_string(),
                nonce: nonce_base + block_no,
            };
            prev = b.hash();
            blocks.push(b);
        }
        blocks
    };

    let branch_a = branch(100, 2);
    let branch_b = branch(200, 2);

    let (observer_1, _) = spawn_miner();
    let (observer_2, _) = spawn_miner();

    for b in branch_a.iter().chain(branch_b.iter()) {
        observer_1.handle_send_block(b.clone(), &b.hash()).unwrap();
    }
    for b in branch_b.iter().chain(branch_a.iter()) {
        observer_2.handle_send_block(b.clone(), &b.hash()).unwrap();
    }

    assert_eq!(observer_1.chain_snapshot().0, observer_2.chain_snapshot().0);
}

// ---------------------------------------------------------------------------
// 5. Overlap enforcement across owners
// ---------------------------------------------------------------------------

#[test]
fn foreign_overlap_is_rejected() {
    let (alice, alice_keys) = spawn_miner();
    let (bob, bob_keys) = spawn_miner();

    // Alice draws a band and bob hears about it.
    let alice_token = authenticate(&alice, &alice_keys);
    mine_one(&alice);
    let submission = alice
        .add_shape(&alice_token, 1, ShapeType::Path, "M 5 5 v 3 h 10 v -5 Z", "transparent", "red")
        .unwrap();
    for outbound in submission.outbound {
        if let blockart_protocol::miner::Outbound::Op(record) = outbound {
            bob.handle_send_op(record).unwrap();
        }
    }

    // Bob's art node now tries to draw across it.
    let bob_token = authenticate(&bob, &bob_keys);
    mine_one(&bob);
    let err = bob
        .add_shape(&bob_token, 1, ShapeType::Path, "M 5 5 h 4 l -2 5 z", "transparent", "blue")
        .unwrap_err();
    assert!(matches!(err, MinerError::ShapeOverlap(_)));
}

// ---------------------------------------------------------------------------
// 6. Proof-of-work integrity
// ---------------------------------------------------------------------------

#[test]
fn under_difficulty_blocks_never_commit() {
    let mut settings = test_settings();
    settings.pow_difficulty_no_op_block = 1;
    let miner = Miner::new(settings.clone(), MinerKeypair::generate());

    // Find a nonce whose hash does NOT end in '0' and deliver it.
    let mut nonce = 0u32;
    let (bad_block, bad_hash) = loop {
        let b = blockart_protocol::chain::Block {
            block_no: 1,
            prev_hash: settings.genesis_block_hash.clone(),
            records: vec![],
            pub_key_string: "someone".to_string(),
            nonce,
        };
        let h = b.hash();
        if !h.ends_with('0') {
            break (b, h);
        }
        nonce += 1;
    };

    let err = miner.handle_send_block(bad_block, &bad_hash).unwrap_err();
    assert!(matches!(err, MinerError::Validation(_)));
    miner.with_state(|s| assert_eq!(s.blocks.tip(), s.blocks.genesis_hash()));

    // And honest mining still finds difficulty-1 blocks quickly.
    assert!(matches!(miner.mine_next(Some(1_000)), MineOutcome::Mined { .. }));
}

// ---------------------------------------------------------------------------
// 7. Signature integrity at the gossip boundary
// ---------------------------------------------------------------------------

#[test]
fn forged_ops_stop_at_ingress() {
    let (alice, alice_keys) = spawn_miner();
    let (bob, _) = spawn_miner();
    let token = authenticate(&alice, &alice_keys);

    mine_one(&alice);
    let submission = alice
        .add_shape(&token, 1, ShapeType::Path, "M 10 10 L 5 5", "transparent", "red")
        .unwrap();

    let mut record = alice.with_state(|s| s.ops.unmined[&submission.op_sig].clone());
    record.op.validate_num = 0; // tamper

    assert!(bob.handle_send_op(record.clone()).is_err());
    bob.with_state(|s| assert!(!s.ops.contains_lifecycle(&record.op_sig)));
}
