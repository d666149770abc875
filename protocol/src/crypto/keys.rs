//! # Key Management
//!
//! ECDSA P-256 keypair handling for miner identities.
//!
//! Every miner (and every shape owner, which is the same thing) is an
//! ECDSA keypair. The public key travels on the wire as the lowercase hex
//! encoding of its uncompressed SEC1 point — that string *is* the owner
//! identity everywhere in the protocol: ink accounts, shape ownership,
//! block attribution.
//!
//! Signatures are RFC 6979 deterministic (same key + same message = same
//! signature), which matters here more than usual: an operation's
//! signature doubles as its content identifier, so re-signing the same
//! operation must not mint a "new" operation.
//!
//! ## Security considerations
//!
//! - Key generation uses the OS RNG. If that is broken, your canvas is the
//!   least of your worries.
//! - Secret key bytes are never logged. If you add logging to this module,
//!   you will be asked to leave.

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from key and signature decoding.
///
/// Deliberately vague about *why* something failed: leaking structure
/// through error messages is a classic crypto footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key encoding")]
    InvalidPublicKey,

    #[error("invalid signature encoding")]
    InvalidSignature,
}

// ---------------------------------------------------------------------------
// MinerKeypair
// ---------------------------------------------------------------------------

/// A miner identity: an ECDSA P-256 signing key plus its derived public key.
///
/// The signing key is the crown jewel. It signs every operation this miner's
/// art nodes submit and anchors the miner's ink account.
///
/// `MinerKeypair` intentionally does NOT implement `Serialize`; exporting a
/// private key should be a deliberate act (`secret_key_hex`), not a side
/// effect of shoving the struct into a JSON response.
pub struct MinerKeypair {
    signing_key: SigningKey,
}

/// The public half of a miner identity, safe to share with the world.
#[derive(Clone, PartialEq, Eq)]
pub struct MinerPublicKey {
    /// Uncompressed SEC1 point bytes (65 bytes, `0x04 || x || y`).
    bytes: Vec<u8>,
}

/// An ECDSA signature over canonical operation JSON, split into its two
/// scalars and carried on the wire as `{"R": hex, "S": hex}`.
///
/// The canonical JSON encoding of this struct is the operation signature
/// string (`op_sig`) — which means it is also the operation's content
/// identifier throughout the op lifecycle. Field order matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpSignature {
    /// Big-endian hex of the r scalar (64 chars).
    #[serde(rename = "R")]
    pub r: String,
    /// Big-endian hex of the s scalar (64 chars).
    #[serde(rename = "S")]
    pub s: String,
}

impl MinerKeypair {
    /// Generates a fresh keypair from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Reconstructs a keypair from a hex-encoded 32-byte secret scalar.
    ///
    /// This is how the node binary loads the key written by `init`. Don't
    /// put raw hex keys anywhere world-readable; the file permissions are
    /// 0600 for a reason.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// Returns the public half of this keypair.
    pub fn public_key(&self) -> MinerPublicKey {
        MinerPublicKey {
            bytes: self
                .signing_key
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
        }
    }

    /// Returns the wire identity string: hex of the uncompressed public key.
    pub fn public_key_string(&self) -> String {
        self.public_key().to_hex()
    }

    /// Exports the raw secret scalar as hex.
    ///
    /// Handle with extreme care; this is the whole identity.
    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Signs a message (RFC 6979, SHA-256 digest) and returns the split
    /// `{R, S}` signature.
    pub fn sign(&self, message: &[u8]) -> OpSignature {
        let sig: Signature = self.signing_key.sign(message);
        let bytes = sig.to_bytes();
        OpSignature {
            r: hex::encode(&bytes[..32]),
            s: hex::encode(&bytes[32..]),
        }
    }

    /// Verifies a signature against this keypair's own public key.
    pub fn verify(&self, message: &[u8], signature: &OpSignature) -> bool {
        self.public_key().verify(message, signature)
    }
}

impl Clone for MinerKeypair {
    /// Cloning a keypair is allowed but should make you slightly
    /// uncomfortable: every copy of a private key is another thing to
    /// protect.
    fn clone(&self) -> Self {
        Self {
            signing_key: self.signing_key.clone(),
        }
    }
}

impl fmt::Debug for MinerKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret material, not even "partially".
        write!(f, "MinerKeypair(pub={})", &self.public_key_string()[..16])
    }
}

impl PartialEq for MinerKeypair {
    /// Two keypairs are equal if their public keys match. Comparing secret
    /// material in non-constant time is a habit we refuse to acquire.
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for MinerKeypair {}

// ---------------------------------------------------------------------------
// MinerPublicKey
// ---------------------------------------------------------------------------

impl MinerPublicKey {
    /// Parses a hex-encoded uncompressed SEC1 public key.
    ///
    /// Validates that the bytes actually encode a point on the P-256 curve;
    /// not every 65-byte string does, and degenerate points have no place
    /// in signature verification.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Hex-encoded wire form of this key.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Verifies an `{R, S}` signature over a message.
    ///
    /// Returns a plain boolean: callers want yes/no, not a taxonomy of the
    /// ways a forged signature can be malformed.
    pub fn verify(&self, message: &[u8], signature: &OpSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(&self.bytes) else {
            return false;
        };
        let Ok(sig) = signature.to_signature() else {
            return false;
        };
        verifying_key.verify(message, &sig).is_ok()
    }
}

impl fmt::Display for MinerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for MinerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MinerPublicKey({}..)", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// OpSignature
// ---------------------------------------------------------------------------

impl OpSignature {
    /// Canonical JSON string form — the `op_sig` content identifier.
    pub fn to_sig_string(&self) -> String {
        // Two short strings with fixed keys; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parses an `op_sig` string back into its scalars.
    pub fn from_sig_string(s: &str) -> Result<Self, KeyError> {
        serde_json::from_str(s).map_err(|_| KeyError::InvalidSignature)
    }

    /// Reassembles the backend signature from the hex scalars.
    fn to_signature(&self) -> Result<Signature, KeyError> {
        let r = hex::decode(&self.r).map_err(|_| KeyError::InvalidSignature)?;
        let s = hex::decode(&self.s).map_err(|_| KeyError::InvalidSignature)?;
        if r.len() != 32 || s.len() != 32 {
            return Err(KeyError::InvalidSignature);
        }
        let mut raw = [0u8; 64];
        raw[..32].copy_from_slice(&r);
        raw[32..].copy_from_slice(&s);
        Signature::from_slice(&raw).map_err(|_| KeyError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let kp = MinerKeypair::generate();
        let msg = b"add shape: M 0 0 h 3";
        let sig = kp.sign(msg);
        assert!(kp.verify(msg, &sig));
    }

    #[test]
    fn wrong_message_fails_verification() {
        let kp = MinerKeypair::generate();
        let sig = kp.sign(b"correct message");
        assert!(!kp.verify(b"tampered message", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp1 = MinerKeypair::generate();
        let kp2 = MinerKeypair::generate();
        let sig = kp1.sign(b"message");
        assert!(!kp2.verify(b"message", &sig));
    }

    #[test]
    fn secret_key_hex_roundtrip() {
        let kp = MinerKeypair::generate();
        let restored = MinerKeypair::from_hex(&kp.secret_key_hex()).unwrap();
        assert_eq!(kp.public_key_string(), restored.public_key_string());
    }

    #[test]
    fn public_key_hex_roundtrip() {
        let kp = MinerKeypair::generate();
        let pk = MinerPublicKey::from_hex(&kp.public_key_string()).unwrap();
        let sig = kp.sign(b"hello canvas");
        assert!(pk.verify(b"hello canvas", &sig));
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(MinerKeypair::from_hex("deadbeef").is_err());
        assert!(MinerKeypair::from_hex("not hex at all").is_err());
        assert!(MinerPublicKey::from_hex("04ab").is_err());
    }

    #[test]
    fn signatures_are_deterministic() {
        // RFC 6979: same key + same message = same signature. The op_sig
        // doubles as a content id, so this is load-bearing, not cosmetic.
        let kp = MinerKeypair::generate();
        let s1 = kp.sign(b"determinism is load-bearing");
        let s2 = kp.sign(b"determinism is load-bearing");
        assert_eq!(s1, s2);
        assert_eq!(s1.to_sig_string(), s2.to_sig_string());
    }

    #[test]
    fn sig_string_roundtrip() {
        let kp = MinerKeypair::generate();
        let sig = kp.sign(b"roundtrip");
        let s = sig.to_sig_string();
        assert!(s.starts_with(r#"{"R":""#));
        let back = OpSignature::from_sig_string(&s).unwrap();
        assert_eq!(sig, back);
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = MinerKeypair::generate();
        let dbg = format!("{:?}", kp);
        assert!(dbg.starts_with("MinerKeypair(pub="));
        assert!(!dbg.contains(&kp.secret_key_hex()));
    }

    #[test]
    fn two_generated_keypairs_differ() {
        let kp1 = MinerKeypair::generate();
        let kp2 = MinerKeypair::generate();
        assert_ne!(kp1.public_key_string(), kp2.public_key_string());
    }

    #[test]
    fn public_key_string_is_uncompressed_sec1() {
        let kp = MinerKeypair::generate();
        let s = kp.public_key_string();
        // 65 bytes hex-encoded, leading 0x04 uncompressed tag.
        assert_eq!(s.len(), 130);
        assert!(s.starts_with("04"));
    }
}
