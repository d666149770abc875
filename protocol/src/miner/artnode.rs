//! # Art-Node Surface
//!
//! The token-gated operations an art node drives through its miner. An
//! art node proves it holds the miner's keypair by signing a single-use
//! nonce (`hello` → `get_token`); every other call presents the token.
//!
//! Submissions go straight into the unmined bucket and out over gossip.
//! Nothing here touches the ledger — ink only moves when a block carrying
//! the operation lands on the canonical chain.

use rand::Rng;
use tracing::info;

use super::engine::Miner;
use super::{OpSubmission, Outbound};
use crate::chain::operation::{timestamp_now_ns, OpType, Operation};
use crate::chain::ops::Bucket;
use crate::config::AUTH_TOKEN_LEN;
use crate::crypto::OpSignature;
use crate::error::MinerError;
use crate::miner::state::MinerState;
use crate::shape::{Shape, ShapeType};

/// Generates a 256-bit lowercase hex string for nonces and tokens.
fn rand_hex256() -> String {
    let mut rng = rand::thread_rng();
    (0..AUTH_TOKEN_LEN)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect()
}

impl Miner {
    fn check_token(&self, state: &MinerState, token: &str) -> Result<(), MinerError> {
        if state.tokens.contains(token) {
            Ok(())
        } else {
            Err(MinerError::InvalidToken(token.to_string()))
        }
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    /// First half of the handshake: hands out a nonce for the art node to
    /// sign.
    pub fn hello(&self) -> String {
        let nonce = rand_hex256();
        self.with_state_mut(|s| s.nonces.insert(nonce.clone()));
        nonce
    }

    /// Second half: verifies the signed nonce and issues an access token
    /// along with the canvas dimensions. The nonce is burned whether or
    /// not the signature checks out.
    pub fn get_token(
        &self,
        nonce: &str,
        r: &str,
        s: &str,
    ) -> Result<(String, u32, u32), MinerError> {
        let signature = OpSignature { r: r.to_string(), s: s.to_string() };
        let mut state = self.state_lock();

        let known_nonce = state.nonces.remove(nonce);
        let valid = self
            .keypair()
            .verify(nonce.as_bytes(), &signature);
        if !known_nonce || !valid {
            return Err(MinerError::InvalidSignature);
        }

        let token = rand_hex256();
        state.tokens.insert(token.clone());
        let canvas = self.settings().canvas_settings;
        info!("issued art-node token");
        Ok((token, canvas.canvas_x_max, canvas.canvas_y_max))
    }

    // -----------------------------------------------------------------------
    // Shape submission
    // -----------------------------------------------------------------------

    /// Validates and submits an ADD operation on behalf of the art node.
    ///
    /// On success the operation is signed, queued for mining, and handed
    /// back for gossip; the reported ink is the balance as it will stand
    /// once the op is mined. Validation failures leave no trace in miner
    /// state.
    #[allow(clippy::too_many_arguments)]
    pub fn add_shape(
        &self,
        token: &str,
        validate_num: u8,
        shape_type: ShapeType,
        svg: &str,
        fill: &str,
        stroke: &str,
    ) -> Result<OpSubmission, MinerError> {
        let mut state = self.state_lock();
        self.check_token(&state, token)?;

        let shape = Shape {
            shape_type,
            svg: svg.to_string(),
            fill: fill.trim().to_string(),
            stroke: stroke.trim().to_string(),
            owner: self.public_key_string().to_string(),
        };

        let cost = self.validate_new_shape(&state, &shape)?;
        // validate_new_shape capped the cost at the owner's u32 balance.
        let cost = cost as u32;

        let record = Operation {
            op_type: OpType::Add,
            shape,
            ink_cost: cost,
            validate_num,
            timestamp: timestamp_now_ns(),
        }
        .sign(self.keypair());

        let op_sig = record.op_sig.clone();
        state.ops.insert(Bucket::Unmined, record.clone());

        let balance = state.ledger.balance(self.public_key_string());
        info!(op_sig_len = op_sig.len(), cost, "art node added shape");
        Ok(OpSubmission {
            op_sig,
            ink_remaining: balance - cost,
            outbound: vec![Outbound::Op(record)],
        })
    }

    /// Submits a REMOVE for a validated shape this miner's key owns.
    ///
    /// The removal repaints the shape canvas-colored and carries the
    /// original ADD's ink cost, so mining it refunds the owner in full.
    pub fn delete_shape(
        &self,
        token: &str,
        shape_hash: &str,
        validate_num: u8,
    ) -> Result<OpSubmission, MinerError> {
        let mut state = self.state_lock();
        self.check_token(&state, token)?;

        let original = match state.ops.validated.get(shape_hash) {
            Some(record) if record.pub_key_string == self.public_key_string() => record.clone(),
            _ => return Err(MinerError::ShapeOwner(shape_hash.to_string())),
        };

        let mut shape = original.op.shape.clone();
        shape.fill = "white".to_string();
        shape.stroke = "white".to_string();

        let record = Operation {
            op_type: OpType::Remove,
            shape,
            ink_cost: original.op.ink_cost,
            validate_num,
            timestamp: timestamp_now_ns(),
        }
        .sign(self.keypair());

        let op_sig = record.op_sig.clone();
        state.ops.insert(Bucket::Unmined, record.clone());

        let balance = state.ledger.balance(self.public_key_string());
        info!(cost = original.op.ink_cost, "art node deleted shape");
        Ok(OpSubmission {
            op_sig,
            ink_remaining: balance.wrapping_add(original.op.ink_cost),
            outbound: vec![Outbound::Op(record)],
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The SVG element for a validated shape, by shape hash.
    ///
    /// Only validated operations are addressable — an art node can't have
    /// learned the hash of anything shallower.
    pub fn get_svg_string(&self, token: &str, shape_hash: &str) -> Result<String, MinerError> {
        let state = self.state_lock();
        self.check_token(&state, token)?;

        let record = state
            .ops
            .validated
            .get(shape_hash)
            .ok_or_else(|| MinerError::InvalidShapeHash(shape_hash.to_string()))?;
        let shape = &record.op.shape;
        Ok(format!(
            r#"<path d="{}" stroke="{}" fill="{}"/>"#,
            shape.svg, shape.stroke, shape.fill
        ))
    }

    /// The local key's current ink balance.
    pub fn get_ink(&self, token: &str) -> Result<u32, MinerError> {
        let state = self.state_lock();
        self.check_token(&state, token)?;
        Ok(state.ledger.balance(self.public_key_string()))
    }

    /// The network-assigned genesis block hash.
    pub fn get_genesis_block(&self, token: &str) -> Result<String, MinerError> {
        let state = self.state_lock();
        self.check_token(&state, token)?;
        Ok(state.blocks.genesis_hash().to_string())
    }

    /// Shape hashes (operation signatures) in a given block.
    pub fn get_shapes(&self, token: &str, block_hash: &str) -> Result<Vec<String>, MinerError> {
        let state = self.state_lock();
        self.check_token(&state, token)?;

        let block = state
            .blocks
            .get(block_hash)
            .ok_or_else(|| MinerError::InvalidBlockHash(block_hash.to_string()))?;
        Ok(block.records.iter().map(|r| r.op_sig.clone()).collect())
    }

    /// Hashes of the blocks building on a given block.
    pub fn get_children(&self, token: &str, block_hash: &str) -> Result<Vec<String>, MinerError> {
        let state = self.state_lock();
        self.check_token(&state, token)?;

        if !state.blocks.contains(block_hash) {
            return Err(MinerError::InvalidBlockHash(block_hash.to_string()));
        }
        Ok(state
            .blocks
            .children(block_hash)
            .map(|c| c.to_vec())
            .unwrap_or_default())
    }

    /// Whether an operation has validated, and if so in which block.
    pub fn op_validated(&self, token: &str, op_sig: &str) -> Result<(bool, String), MinerError> {
        let state = self.state_lock();
        self.check_token(&state, token)?;

        if !state.ops.validated.contains_key(op_sig) {
            return Ok((false, String::new()));
        }
        match state.blocks.find_record(op_sig) {
            Some((hash, _)) => Ok((true, hash)),
            // Validated but off-chain should be impossible; report the
            // hash as unknown rather than inventing one.
            None => Err(MinerError::InvalidShapeHash(op_sig.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CanvasSettings, MinerNetSettings};
    use crate::crypto::MinerKeypair;
    use crate::miner::MineOutcome;

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

    fn miner() -> Miner {
        Miner::new(test_settings(), MinerKeypair::generate())
    }

    fn mine_one(m: &Miner) {
        assert!(matches!(m.mine_next(Some(10_000)), MineOutcome::Mined { .. }));
    }

    fn authed(m: &Miner) -> String {
        let nonce = m.hello();
        let sig = m.keypair().sign(nonce.as_bytes());
        let (token, x, y) = m.get_token(&nonce, &sig.r, &sig.s).unwrap();
        assert_eq!((x, y), (1024, 1024));
        token
    }

    // -- Authentication ------------------------------------------------------

    #[test]
    fn token_handshake() {
        let m = miner();
        let token = authed(&m);
        assert_eq!(token.len(), AUTH_TOKEN_LEN);
        assert!(m.get_ink(&token).is_ok());
    }

    #[test]
    fn nonce_is_single_use() {
        let m = miner();
        let nonce = m.hello();
        let sig = m.keypair().sign(nonce.as_bytes());
        assert!(m.get_token(&nonce, &sig.r, &sig.s).is_ok());
        assert!(matches!(
            m.get_token(&nonce, &sig.r, &sig.s),
            Err(MinerError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_key_cannot_get_token() {
        let m = miner();
        let nonce = m.hello();
        let intruder = MinerKeypair::generate();
        let sig = intruder.sign(nonce.as_bytes());
        assert!(matches!(
            m.get_token(&nonce, &sig.r, &sig.s),
            Err(MinerError::InvalidSignature)
        ));
    }

    #[test]
    fn calls_without_token_are_refused() {
        let m = miner();
        assert!(matches!(
            m.get_ink("bogus-token"),
            Err(MinerError::InvalidToken(_))
        ));
        assert!(matches!(
            m.add_shape("bogus-token", 1, ShapeType::Path, "M 0 0 h 1", "transparent", "red"),
            Err(MinerError::InvalidToken(_))
        ));
    }

    // -- AddShape ------------------------------------------------------------

    #[test]
    fn add_shape_queues_and_reports_ink() {
        let m = miner();
        mine_one(&m); // 25 ink
        let token = authed(&m);

        let submission = m
            .add_shape(&token, 1, ShapeType::Path, "M 10 10 L 5 5", " transparent ", "red")
            .unwrap();
        assert_eq!(submission.ink_remaining, 25 - 8);
        assert_eq!(submission.outbound.len(), 1);
        m.with_state(|s| assert!(s.ops.unmined.contains_key(&submission.op_sig)));
    }

    #[test]
    fn add_shape_propagates_validation_errors() {
        let m = miner();
        let token = authed(&m);

        // Broke owner.
        assert!(matches!(
            m.add_shape(&token, 1, ShapeType::Path, "M 10 10 L 5 5", "transparent", "red"),
            Err(MinerError::InsufficientInk(0))
        ));
        // Nothing was queued or gossiped.
        m.with_state(|s| assert!(s.ops.unmined.is_empty()));

        mine_one(&m);
        assert!(matches!(
            m.add_shape(&token, 1, ShapeType::Path, "M 5 5 h -7", "transparent", "red"),
            Err(MinerError::OutOfBounds)
        ));
    }

    // -- DeleteShape ---------------------------------------------------------

    /// Drives an ADD through mining until it validates, then returns its
    /// shape hash.
    fn add_and_validate(m: &Miner, token: &str) -> String {
        mine_one(m);
        let submission = m
            .add_shape(token, 1, ShapeType::Path, "M 10 10 L 5 5", "transparent", "red")
            .unwrap();
        mine_one(m); // mined, depth 0
        mine_one(m); // depth 1 == validate_num → validated
        m.with_state(|s| assert!(s.ops.validated.contains_key(&submission.op_sig)));
        submission.op_sig
    }

    #[test]
    fn delete_shape_refunds_original_cost() {
        let m = miner();
        let token = authed(&m);
        let shape_hash = add_and_validate(&m, &token);

        let balance = m.get_ink(&token).unwrap();
        let submission = m.delete_shape(&token, &shape_hash, 1).unwrap();
        assert_eq!(submission.ink_remaining, balance + 8);

        // The REMOVE is queued with the original cost and a white repaint.
        m.with_state(|s| {
            let record = &s.ops.unmined[&submission.op_sig];
            assert_eq!(record.op.op_type, OpType::Remove);
            assert_eq!(record.op.ink_cost, 8);
            assert_eq!(record.op.shape.fill, "white");
        });

        // Mine it in: the refund lands on the ledger.
        mine_one(&m);
        assert_eq!(m.get_ink(&token).unwrap(), balance + 8 + 50);
    }

    #[test]
    fn delete_requires_ownership_and_validation() {
        let m = miner();
        let token = authed(&m);

        // Unknown hash.
        assert!(matches!(
            m.delete_shape(&token, "no-such-shape", 1),
            Err(MinerError::ShapeOwner(_))
        ));

        // A validated shape owned by someone else.
        let other = MinerKeypair::generate();
        let foreign = Operation {
            op_type: OpType::Add,
            shape: Shape {
                shape_type: ShapeType::Path,
                svg: "M 0 0 h 1".to_string(),
                fill: "transparent".to_string(),
                stroke: "red".to_string(),
                owner: other.public_key_string(),
            },
            ink_cost: 1,
            validate_num: 0,
            timestamp: timestamp_now_ns(),
        }
        .sign(&other);
        let sig = foreign.op_sig.clone();
        m.with_state_mut(|s| s.ops.insert(Bucket::Validated, foreign));

        assert!(matches!(
            m.delete_shape(&token, &sig, 1),
            Err(MinerError::ShapeOwner(_))
        ));
    }

    // -- Queries -------------------------------------------------------------

    #[test]
    fn svg_string_for_validated_shape() {
        let m = miner();
        let token = authed(&m);
        let shape_hash = add_and_validate(&m, &token);

        let svg = m.get_svg_string(&token, &shape_hash).unwrap();
        assert_eq!(svg, r#"<path d="M 10 10 L 5 5" stroke="red" fill="transparent"/>"#);

        assert!(matches!(
            m.get_svg_string(&token, "unknown"),
            Err(MinerError::InvalidShapeHash(_))
        ));
    }

    #[test]
    fn genesis_shapes_and_children() {
        let m = miner();
        let token = authed(&m);
        let genesis = m.get_genesis_block(&token).unwrap();
        assert_eq!(genesis, m.settings().genesis_block_hash);

        mine_one(&m);
        let children = m.get_children(&token, &genesis).unwrap();
        assert_eq!(children.len(), 1);

        // Fresh tip has no children yet but is a known block.
        assert!(m.get_children(&token, &children[0]).unwrap().is_empty());

        assert!(m.get_shapes(&token, &children[0]).unwrap().is_empty());
        assert!(matches!(
            m.get_shapes(&token, "nope"),
            Err(MinerError::InvalidBlockHash(_))
        ));
    }

    #[test]
    fn op_validated_reports_containing_block() {
        let m = miner();
        let token = authed(&m);

        let (pending, _) = {
            mine_one(&m);
            let submission = m
                .add_shape(&token, 2, ShapeType::Path, "M 10 10 L 5 5", "transparent", "red")
                .unwrap();
            (submission.op_sig, ())
        };

        mine_one(&m); // depth 0, not yet validated
        assert_eq!(m.op_validated(&token, &pending).unwrap(), (false, String::new()));

        mine_one(&m);
        mine_one(&m); // depth 2 → validated
        let (ok, block_hash) = m.op_validated(&token, &pending).unwrap();
        assert!(ok);
        m.with_state(|s| {
            let block = s.blocks.get(&block_hash).expect("containing block");
            assert!(block.records.iter().any(|r| r.op_sig == pending));
        });
    }
}
