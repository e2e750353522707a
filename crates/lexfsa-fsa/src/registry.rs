// Signature registry: one stored copy of every distinct frozen node.
//
// Two frozen nodes are equivalent exactly when their arc lists (label,
// finality, target) are equal, because their targets are already canonical.
// The registry hashes the raw arc bytes and compares candidate nodes in place
// inside the shared arc store.

use std::hash::BuildHasher;

use hashbrown::{DefaultHashBuilder, HashTable};

use crate::FsaError;
use crate::memory::ArcRecord;

/// Returns the arcs of the node starting at `node`, up to its last arc.
pub(crate) fn node_arcs(store: &[ArcRecord], node: u32) -> &[ArcRecord] {
    let start = node as usize;
    let tail = &store[start..];
    let len = tail
        .iter()
        .position(ArcRecord::is_last)
        .map_or(tail.len(), |i| i + 1);
    &tail[..len]
}

#[derive(Default)]
pub struct SignatureRegistry {
    table: HashTable<u32>,
    hasher: DefaultHashBuilder,
    hits: usize,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct nodes registered.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of lookups answered by an existing node.
    pub fn hits(&self) -> usize {
        self.hits
    }

    fn hash(hasher: &DefaultHashBuilder, arcs: &[ArcRecord]) -> u64 {
        hasher.hash_one(bytemuck::cast_slice::<ArcRecord, u8>(arcs))
    }

    /// Returns the id of the node equivalent to `arcs`, appending `arcs` to
    /// `store` when no such node exists yet.
    ///
    /// `arcs` must be non-empty with the last flag set on its final element.
    pub fn intern(
        &mut self,
        store: &mut Vec<ArcRecord>,
        arcs: &[ArcRecord],
    ) -> Result<u32, FsaError> {
        debug_assert!(arcs.last().is_some_and(ArcRecord::is_last));
        let hash = Self::hash(&self.hasher, arcs);
        if let Some(&node) = self
            .table
            .find(hash, |&node| node_arcs(store, node) == arcs)
        {
            self.hits += 1;
            return Ok(node);
        }

        let end = store.len() + arcs.len();
        if end > u32::MAX as usize {
            return Err(FsaError::AddressOverflow {
                value: end as u64,
                max_bytes: 4,
            });
        }
        let node = store.len() as u32;
        store.extend_from_slice(arcs);

        let hasher = &self.hasher;
        let frozen: &[ArcRecord] = store;
        self.table.insert_unique(hash, node, |&other| {
            Self::hash(hasher, node_arcs(frozen, other))
        });
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ARC_LAST;

    fn node(labels: &[u8]) -> Vec<ArcRecord> {
        let mut arcs: Vec<ArcRecord> = labels
            .iter()
            .map(|&l| ArcRecord::new(l, 0, true))
            .collect();
        if let Some(last) = arcs.last_mut() {
            last.flags |= ARC_LAST;
        }
        arcs
    }

    #[test]
    fn equal_nodes_are_stored_once() {
        let mut store = vec![ArcRecord::new(0, 0, false)];
        let mut registry = SignatureRegistry::new();

        let first = registry.intern(&mut store, &node(b"ab")).unwrap();
        let second = registry.intern(&mut store, &node(b"ab")).unwrap();
        let other = registry.intern(&mut store, &node(b"ac")).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.hits(), 1);
        assert_eq!(store.len(), 5);
        assert_eq!(node_arcs(&store, other), &node(b"ac")[..]);
    }

    #[test]
    fn finality_distinguishes_nodes() {
        let mut store = vec![ArcRecord::new(0, 0, false)];
        let mut registry = SignatureRegistry::new();
        let mut non_final = node(b"a");
        non_final[0].flags &= !crate::memory::ARC_FINAL;

        let a = registry.intern(&mut store, &node(b"a")).unwrap();
        let b = registry.intern(&mut store, &non_final).unwrap();
        assert_ne!(a, b);
    }
}
