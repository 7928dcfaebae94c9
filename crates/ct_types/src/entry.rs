// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Log entries, before and after sequencing.

use crate::CtError;
use byteorder::{BigEndian, WriteBytesExt};
use length_prefixed::WriteLengthPrefixedBytesExt;
use tlog_core::{record_hash, Hash};

/// Unix timestamp, measured since the epoch (January 1, 1970, 00:00),
/// ignoring leap seconds, in milliseconds.
pub type UnixTimestamp = u64;

/// Position of an entry in the log, and of its leaf in the Merkle tree.
pub type SequenceNumber = u64;

/// Maximum size of an entry's leaf data, which is encoded as `opaque<1..2^24-1>`.
pub const MAX_LEAF_DATA_LEN: usize = (1 << 24) - 1;

/// An entry accepted by some node of the cluster.
///
/// A pending entry has no sequence number. The sequencer attaches one to its
/// local copy once the entry is assigned a position in the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggedEntry {
    hash: Hash,
    timestamp: UnixTimestamp,
    leaf_data: Vec<u8>,
    sequence_number: Option<SequenceNumber>,
}

impl LoggedEntry {
    /// Returns a new pending entry for the given leaf data, identified by the
    /// SHA-256 hash of that data.
    ///
    /// # Errors
    ///
    /// Returns an error if the leaf data is empty or larger than [`MAX_LEAF_DATA_LEN`].
    pub fn new(leaf_data: Vec<u8>, timestamp: UnixTimestamp) -> Result<Self, CtError> {
        if leaf_data.is_empty() || leaf_data.len() > MAX_LEAF_DATA_LEN {
            return Err(CtError::InvalidLeafLength(leaf_data.len()));
        }
        Ok(Self {
            hash: Hash::digest(&leaf_data),
            timestamp,
            leaf_data,
            sequence_number: None,
        })
    }

    /// The content hash identifying this entry across the cluster.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// The time at which a node accepted this entry.
    pub fn timestamp(&self) -> UnixTimestamp {
        self.timestamp
    }

    pub fn leaf_data(&self) -> &[u8] {
        &self.leaf_data
    }

    /// The assigned sequence number, or `None` if this entry is still pending.
    pub fn sequence_number(&self) -> Option<SequenceNumber> {
        self.sequence_number
    }

    pub fn set_sequence_number(&mut self, sequence_number: SequenceNumber) {
        self.sequence_number = Some(sequence_number);
    }

    #[must_use]
    pub fn with_sequence_number(mut self, sequence_number: SequenceNumber) -> Self {
        self.set_sequence_number(sequence_number);
        self
    }

    /// Returns the canonical serialization of this entry as a Merkle tree leaf.
    ///
    /// ```text
    /// struct {
    ///     Version version;                  // v1(0)
    ///     MerkleLeafType leaf_type;         // timestamped_entry(0)
    ///     uint64 timestamp;
    ///     LogEntryType entry_type;          // x509_entry(0)
    ///     opaque leaf_data<1..2^24-1>;
    ///     CtExtensions extensions;          // empty
    /// } MerkleTreeLeaf;
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if writing to the internal buffer fails, which should never happen
    /// since the leaf data length is checked on construction.
    pub fn merkle_tree_leaf(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(2 + 8 + 2 + 3 + self.leaf_data.len() + 2);
        buffer.push(0); // version = v1 (0)
        buffer.push(0); // leaf_type = timestamped_entry (0)
        buffer.write_u64::<BigEndian>(self.timestamp).unwrap();
        buffer.write_u16::<BigEndian>(0).unwrap(); // entry_type = x509_entry (0)
        buffer.write_length_prefixed(&self.leaf_data, 3).unwrap();
        buffer.write_length_prefixed(&[], 2).unwrap();
        buffer
    }

    /// Returns the RFC 6962 leaf hash of [`Self::merkle_tree_leaf`].
    pub fn leaf_hash(&self) -> Hash {
        record_hash(&self.merkle_tree_leaf())
    }
}
