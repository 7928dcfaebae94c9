// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Checks the compact tree root against the reference Merkle Tree Hash after
//! every append.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tlog_core::{record_hash, root_hash, CompactMerkleTree};

fuzz_target!(|leaves: Vec<Vec<u8>>| {
    let mut tree = CompactMerkleTree::new();
    let mut leaf_hashes = Vec::with_capacity(leaves.len());
    for (i, leaf) in leaves.iter().enumerate() {
        assert_eq!(tree.add_leaf(leaf), i as u64);
        leaf_hashes.push(record_hash(leaf));
        assert_eq!(tree.current_root(), root_hash(&leaf_hashes));
    }
});
