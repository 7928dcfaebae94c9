// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! State shared between the nodes of a log cluster through the consistent store.

use crate::{SequenceNumber, SignedTreeHead};
use serde::{Deserialize, Serialize};
use tlog_core::Hash;

/// A single assignment of a sequence number to an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub entry_hash: Hash,
    pub sequence_number: SequenceNumber,
}

/// The cluster's authoritative record of which entry holds which sequence number.
///
/// Each hash and each sequence number appears at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceMapping {
    pub mappings: Vec<Mapping>,
}

impl SequenceMapping {
    /// Returns the highest assigned sequence number, if any.
    pub fn max_sequence_number(&self) -> Option<SequenceNumber> {
        self.mappings.iter().map(|m| m.sequence_number).max()
    }
}

/// State a node publishes about itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNodeState {
    pub node_id: String,
    /// The most recent tree head this node has signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_sth: Option<SignedTreeHead>,
}
