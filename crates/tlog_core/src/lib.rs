// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! # tlog core
//!
//! Merkle tree primitives for an [RFC 6962](https://datatracker.ietf.org/doc/html/rfc6962)
//! transparency log: leaf and node hashing, the reference Merkle Tree Hash, and
//! a compact tree that supports incremental appends.

pub mod compact;
pub mod tlog;

pub use compact::*;
pub use tlog::*;
