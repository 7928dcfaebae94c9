// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

use ct_types::LoggedEntry;
use std::cmp::Ordering;

/// Orders pending entries by submission timestamp, then by content hash.
///
/// Sorting with this comparator makes sequence number assignment a function
/// of the set of pending entries alone, whatever order the store returns
/// them in.
pub fn pending_entries_order(x: &LoggedEntry, y: &LoggedEntry) -> Ordering {
    x.timestamp()
        .cmp(&y.timestamp())
        .then_with(|| x.hash().cmp(y.hash()))
}
