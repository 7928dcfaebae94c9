// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Storage the tree signer depends on: a durable per-node database of
//! sequenced entries, and a consistent store shared by the cluster.

use ct_types::{
    ClusterNodeState, LoggedEntry, SequenceMapping, SequenceNumber, SignedTreeHead,
};
use thiserror::Error;

/// A value read from the [`ConsistentStore`], together with the version it
/// was read at. Writing it back succeeds only if the stored version is
/// unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryHandle<T> {
    entry: T,
    version: Option<u64>,
}

impl<T> EntryHandle<T> {
    /// Returns a handle for `entry` read at `version`, or `None` if the key
    /// did not exist yet.
    pub fn new(entry: T, version: Option<u64>) -> Self {
        Self { entry, version }
    }

    pub fn entry(&self) -> &T {
        &self.entry
    }

    pub fn entry_mut(&mut self) -> &mut T {
        &mut self.entry
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn into_entry(self) -> T {
        self.entry
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("version mismatch for {key}: expected {expected:?}, found {found:?}")]
    VersionMismatch {
        key: String,
        expected: Option<u64>,
        found: Option<u64>,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("sequence number {0} already in use")]
    SequenceNumberAlreadyInUse(SequenceNumber),
    #[error("entry has no sequence number")]
    MissingSequenceNumber,
    #[error("{0}")]
    Other(String),
}

/// Durable local storage of sequenced entries.
#[allow(async_fn_in_trait)]
pub trait Database {
    /// Iterator over sequenced entries in increasing sequence number order.
    /// It may skip sequence numbers that are not yet present.
    type Scan: Iterator<Item = Result<LoggedEntry, DatabaseError>>;

    /// Stores a sequenced entry.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::SequenceNumberAlreadyInUse`] if an entry is
    /// already stored at the entry's sequence number, and
    /// [`DatabaseError::MissingSequenceNumber`] if the entry has none.
    async fn create_sequenced_entry(&self, entry: &LoggedEntry) -> Result<(), DatabaseError>;

    /// Returns the entry stored at `sequence_number`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read.
    async fn get_entry(
        &self,
        sequence_number: SequenceNumber,
    ) -> Result<Option<LoggedEntry>, DatabaseError>;

    /// Starts a scan at `start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan cannot be started.
    async fn scan_entries(&self, start: SequenceNumber) -> Result<Self::Scan, DatabaseError>;

    /// Returns the number of entries stored contiguously from sequence number zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read.
    async fn tree_size(&self) -> Result<u64, DatabaseError>;
}

/// Linearizable storage shared by all nodes of the cluster.
#[allow(async_fn_in_trait)]
pub trait ConsistentStore {
    /// Returns a candidate for the next fresh sequence number, above every
    /// number in the mapping as last written.
    ///
    /// This is not an exclusive allocation: concurrent callers may receive
    /// the same value. Conflicting assignments are rejected when the mapping
    /// is written back with [`update_sequence_mapping`](Self::update_sequence_mapping).
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn next_available_sequence_number(&self) -> Result<SequenceNumber, StoreError>;

    /// Returns the entries accepted by any node and not yet covered by the
    /// serving tree head.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn get_pending_entries(&self) -> Result<Vec<LoggedEntry>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read. A missing mapping is
    /// returned as an empty mapping with no version.
    async fn get_sequence_mapping(&self) -> Result<EntryHandle<SequenceMapping>, StoreError>;

    /// Replaces the mapping, provided nobody has written it since `mapping` was read.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionMismatch`] if the mapping was modified
    /// concurrently.
    async fn update_sequence_mapping(
        &self,
        mapping: &EntryHandle<SequenceMapping>,
    ) -> Result<(), StoreError>;

    /// Returns the tree head the cluster currently serves.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no tree head has been served yet.
    async fn get_serving_sth(&self) -> Result<SignedTreeHead, StoreError>;

    /// Returns the state the node `node_id` last published.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if that node never published any.
    async fn get_cluster_node_state(&self, node_id: &str) -> Result<ClusterNodeState, StoreError>;

    /// Publishes `state` for the node `state.node_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    async fn set_cluster_node_state(&self, state: &ClusterNodeState) -> Result<(), StoreError>;
}
