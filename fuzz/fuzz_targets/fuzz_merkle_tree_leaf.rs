// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

#![no_main]

use ct_types::LoggedEntry;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u64, Vec<u8>)| {
    let (timestamp, data) = input;
    let Ok(entry) = LoggedEntry::new(data, timestamp) else {
        return;
    };
    let leaf = entry.merkle_tree_leaf();
    // Fixed header, 24-bit length prefix, data, empty extensions.
    assert_eq!(leaf.len(), 12 + 3 + entry.leaf_data().len() + 2);
    assert_eq!(leaf[2..10], timestamp.to_be_bytes());
    assert_eq!(&leaf[15..leaf.len() - 2], entry.leaf_data());
});
