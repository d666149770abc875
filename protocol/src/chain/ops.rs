//! # Operation Lifecycle Buckets
//!
//! Every operation the miner knows about sits in exactly one of three
//! lifecycle buckets, keyed by its signature string:
//!
//! - **unmined** — submitted or gossiped, not yet in any canonical block.
//! - **unvalidated** — in a canonical block, but not yet deep enough to
//!   satisfy its `validate_num`.
//! - **validated** — buried at least `validate_num` blocks under the tip.
//!
//! A fourth bucket, **temp**, exists only while a peer block is being
//! validated: the block's own records are staged there so they
//! overlap-check against each other, then the bucket is cleared whatever
//! the outcome.
//!
//! The buckets are plain maps; the miner engine moves records between
//! them under its state lock. Overlap checks iterate all four.

use std::collections::HashMap;

use super::operation::OperationRecord;

/// Which bucket an operation sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Unmined,
    Unvalidated,
    Validated,
    Temp,
}

/// The four operation maps.
#[derive(Debug, Clone, Default)]
pub struct OpBuckets {
    pub unmined: HashMap<String, OperationRecord>,
    pub unvalidated: HashMap<String, OperationRecord>,
    pub validated: HashMap<String, OperationRecord>,
    pub temp: HashMap<String, OperationRecord>,
}

impl OpBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut HashMap<String, OperationRecord> {
        match bucket {
            Bucket::Unmined => &mut self.unmined,
            Bucket::Unvalidated => &mut self.unvalidated,
            Bucket::Validated => &mut self.validated,
            Bucket::Temp => &mut self.temp,
        }
    }

    /// Inserts a record into a bucket under its own signature.
    pub fn insert(&mut self, bucket: Bucket, record: OperationRecord) {
        self.bucket_mut(bucket).insert(record.op_sig.clone(), record);
    }

    /// Removes a record from a bucket, returning it if present.
    pub fn remove(&mut self, bucket: Bucket, op_sig: &str) -> Option<OperationRecord> {
        self.bucket_mut(bucket).remove(op_sig)
    }

    /// True when the signature is present in unmined, unvalidated, or
    /// validated — the "already seen" test that terminates gossip loops.
    pub fn contains_lifecycle(&self, op_sig: &str) -> bool {
        self.unmined.contains_key(op_sig)
            || self.unvalidated.contains_key(op_sig)
            || self.validated.contains_key(op_sig)
    }

    /// Iterates every record across all four buckets, for overlap checks.
    pub fn iter_all(&self) -> impl Iterator<Item = (&String, &OperationRecord)> {
        self.unmined
            .iter()
            .chain(self.unvalidated.iter())
            .chain(self.validated.iter())
            .chain(self.temp.iter())
    }

    /// Moves a record between buckets; no-op if the signature is absent
    /// from the source.
    pub fn shift(&mut self, from: Bucket, to: Bucket, op_sig: &str) {
        if let Some(record) = self.remove(from, op_sig) {
            self.insert(to, record);
        }
    }

    /// Drops everything staged in temp, whatever the validation outcome.
    pub fn clear_temp(&mut self) {
        self.temp.clear();
    }

    /// Snapshot of the unmined bucket, ordered by signature so every
    /// candidate block built from the same pool is identical.
    pub fn unmined_snapshot(&self) -> Vec<OperationRecord> {
        let mut records: Vec<OperationRecord> = self.unmined.values().cloned().collect();
        records.sort_by(|a, b| a.op_sig.cmp(&b.op_sig));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::operation::{OpType, Operation};
    use crate::shape::{Shape, ShapeType};

    fn record(sig: &str) -> OperationRecord {
        OperationRecord {
            op: Operation {
                op_type: OpType::Add,
                shape: Shape {
                    shape_type: ShapeType::Path,
                    svg: "M 0 0 h 1".to_string(),
                    fill: "transparent".to_string(),
                    stroke: "red".to_string(),
                    owner: "owner".to_string(),
                },
                ink_cost: 1,
                validate_num: 0,
                timestamp: 0,
            },
            op_sig: sig.to_string(),
            pub_key_string: "owner".to_string(),
        }
    }

    #[test]
    fn insert_and_lifecycle_lookup() {
        let mut buckets = OpBuckets::new();
        buckets.insert(Bucket::Unmined, record("a"));
        assert!(buckets.contains_lifecycle("a"));
        assert!(!buckets.contains_lifecycle("b"));
    }

    #[test]
    fn temp_is_not_lifecycle() {
        let mut buckets = OpBuckets::new();
        buckets.insert(Bucket::Temp, record("t"));
        assert!(!buckets.contains_lifecycle("t"));
        // But overlap iteration sees it.
        assert_eq!(buckets.iter_all().count(), 1);
        buckets.clear_temp();
        assert_eq!(buckets.iter_all().count(), 0);
    }

    #[test]
    fn shift_moves_between_buckets() {
        let mut buckets = OpBuckets::new();
        buckets.insert(Bucket::Unmined, record("a"));
        buckets.shift(Bucket::Unmined, Bucket::Unvalidated, "a");
        assert!(buckets.unmined.is_empty());
        assert!(buckets.unvalidated.contains_key("a"));

        // Shifting a missing signature does nothing.
        buckets.shift(Bucket::Unmined, Bucket::Validated, "missing");
        assert!(buckets.validated.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_and_detached() {
        let mut buckets = OpBuckets::new();
        buckets.insert(Bucket::Unmined, record("c"));
        buckets.insert(Bucket::Unmined, record("a"));
        buckets.insert(Bucket::Unmined, record("b"));

        let snap = buckets.unmined_snapshot();
        let sigs: Vec<&str> = snap.iter().map(|r| r.op_sig.as_str()).collect();
        assert_eq!(sigs, vec!["a", "b", "c"]);

        // Mutating the buckets afterwards does not affect the snapshot.
        buckets.unmined.clear();
        assert_eq!(snap.len(), 3);
    }

    #[test]
    fn iter_all_spans_every_bucket() {
        let mut buckets = OpBuckets::new();
        buckets.insert(Bucket::Unmined, record("a"));
        buckets.insert(Bucket::Unvalidated, record("b"));
        buckets.insert(Bucket::Validated, record("c"));
        buckets.insert(Bucket::Temp, record("d"));
        assert_eq!(buckets.iter_all().count(), 4);
    }
}
