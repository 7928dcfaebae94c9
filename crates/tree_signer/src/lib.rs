// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! # tree signer
//!
//! The sequencing and signing core of a clustered
//! [RFC 6962](https://datatracker.ietf.org/doc/html/rfc6962) log.
//!
//! Nodes accept entries into a pending set held in a [`ConsistentStore`]
//! shared by the cluster. Each node runs a [`TreeSigner`], which
//! periodically:
//!
//! 1. assigns sequence numbers to pending entries old enough to be visible to
//!    every node ([`TreeSigner::sequence_new_entries`]),
//! 2. appends the newly sequenced entries from its local [`Database`] to its
//!    Merkle tree and signs a new tree head ([`TreeSigner::update_tree`]),
//! 3. publishes that tree head as its node state
//!    ([`TreeSigner::publish_node_state`]).
//!
//! The host drives these rounds, installs a [`log`] implementation, and
//! exits on [`TreeSignerError::Fatal`].

mod backends;
mod config;
mod error;
pub mod memory;
mod metrics;
mod ordering;
mod sequencer;
mod signer;
#[cfg(test)]
mod test_utils;
mod tree_builder;
mod util;

pub use backends::*;
pub use config::*;
pub use error::*;
pub use memory::{MemoryConsistentStore, MemoryDatabase};
pub use ordering::*;
pub use sequencer::*;
pub use signer::*;
pub use tree_builder::*;
