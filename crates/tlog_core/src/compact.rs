// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! An append-only Merkle tree that stores only the roots of its maximal
//! complete subtrees.

use crate::tlog::{node_hash, record_hash, Hash, EMPTY_HASH};

/// A compact Merkle tree supporting appends and root computation in
/// logarithmic space.
///
/// `nodes[i]` holds the root of a complete subtree of `2^i` leaves, and is
/// populated exactly when bit `i` of the leaf count is set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactMerkleTree {
    nodes: Vec<Option<Hash>>,
    size: u64,
}

impl CompactMerkleTree {
    /// Returns an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a leaf with the given data and returns its index.
    pub fn add_leaf(&mut self, data: &[u8]) -> u64 {
        self.add_leaf_hash(record_hash(data))
    }

    /// Appends a leaf by its precomputed leaf hash and returns its index.
    pub fn add_leaf_hash(&mut self, leaf_hash: Hash) -> u64 {
        let mut level = 0;
        let mut hash = leaf_hash;
        // Merge complete subtrees of equal size, like a binary carry.
        while let Some(left) = self.nodes.get_mut(level).and_then(Option::take) {
            hash = node_hash(left, hash);
            level += 1;
        }
        if level == self.nodes.len() {
            self.nodes.push(Some(hash));
        } else {
            self.nodes[level] = Some(hash);
        }
        self.size += 1;
        self.size - 1
    }

    /// Returns the number of leaves in the tree.
    pub fn leaf_count(&self) -> u64 {
        self.size
    }

    /// Returns the RFC 6962 Merkle Tree Hash of the current leaves.
    pub fn current_root(&self) -> Hash {
        self.nodes
            .iter()
            .flatten()
            .fold(None, |acc, &subtree| match acc {
                None => Some(subtree),
                Some(right) => Some(node_hash(subtree, right)),
            })
            .unwrap_or(EMPTY_HASH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root_hash;

    #[test]
    fn test_empty() {
        let tree = CompactMerkleTree::new();
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(tree.current_root(), EMPTY_HASH);
    }

    #[test]
    fn test_matches_reference_root() {
        let mut tree = CompactMerkleTree::new();
        let mut leaf_hashes = Vec::new();
        for i in 0u32..130 {
            let data = i.to_be_bytes();
            assert_eq!(tree.add_leaf(&data), u64::from(i));
            leaf_hashes.push(record_hash(&data));
            assert_eq!(tree.leaf_count(), u64::from(i) + 1);
            assert_eq!(tree.current_root(), root_hash(&leaf_hashes), "size {}", i + 1);
        }
    }

    #[test]
    fn test_add_leaf_hash() {
        let mut by_data = CompactMerkleTree::new();
        let mut by_hash = CompactMerkleTree::new();
        for i in 0u8..11 {
            by_data.add_leaf(&[i, i]);
            by_hash.add_leaf_hash(record_hash(&[i, i]));
        }
        assert_eq!(by_data, by_hash);
    }

    #[test]
    fn test_space_is_logarithmic() {
        let mut tree = CompactMerkleTree::new();
        for i in 0u32..1024 {
            tree.add_leaf(&i.to_le_bytes());
        }
        // 1024 = 2^10: a single complete subtree.
        assert_eq!(tree.nodes.iter().flatten().count(), 1);
        tree.add_leaf(b"one more");
        assert_eq!(tree.nodes.iter().flatten().count(), 2);
    }
}
