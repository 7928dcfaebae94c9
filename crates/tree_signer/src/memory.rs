// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! In-memory [`Database`] and [`ConsistentStore`] implementations, for
//! single-process deployments and tests.
//!
//! Both use interior mutability so they can be shared by reference between
//! several tree signers on one thread, each playing a node of the cluster.

use crate::{ConsistentStore, Database, DatabaseError, EntryHandle, StoreError};
use ct_types::{
    ClusterNodeState, LoggedEntry, SequenceMapping, SequenceNumber, SignedTreeHead,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use tlog_core::Hash;

const SEQUENCE_MAPPING_KEY: &str = "sequence_mapping";
const SERVING_STH_KEY: &str = "serving_sth";

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    entries: RefCell<BTreeMap<SequenceNumber, LoggedEntry>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry stored at `sequence_number`, if any.
    pub fn get(&self, sequence_number: SequenceNumber) -> Option<LoggedEntry> {
        self.entries.borrow().get(&sequence_number).cloned()
    }

    /// Returns the number of stored entries, including any after a gap.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Database for MemoryDatabase {
    type Scan = std::vec::IntoIter<Result<LoggedEntry, DatabaseError>>;

    async fn create_sequenced_entry(&self, entry: &LoggedEntry) -> Result<(), DatabaseError> {
        let sequence_number = entry
            .sequence_number()
            .ok_or(DatabaseError::MissingSequenceNumber)?;
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&sequence_number) {
            return Err(DatabaseError::SequenceNumberAlreadyInUse(sequence_number));
        }
        entries.insert(sequence_number, entry.clone());
        Ok(())
    }

    async fn get_entry(
        &self,
        sequence_number: SequenceNumber,
    ) -> Result<Option<LoggedEntry>, DatabaseError> {
        Ok(self.get(sequence_number))
    }

    async fn scan_entries(&self, start: SequenceNumber) -> Result<Self::Scan, DatabaseError> {
        Ok(self
            .entries
            .borrow()
            .range(start..)
            .map(|(_, entry)| Ok(entry.clone()))
            .collect::<Vec<_>>()
            .into_iter())
    }

    async fn tree_size(&self) -> Result<u64, DatabaseError> {
        Ok(self
            .entries
            .borrow()
            .keys()
            .zip(0..)
            .take_while(|(sequence_number, expected)| **sequence_number == *expected)
            .count() as u64)
    }
}

#[derive(Debug, Default)]
pub struct MemoryConsistentStore {
    pending: RefCell<BTreeMap<Hash, LoggedEntry>>,
    mapping: RefCell<(SequenceMapping, Option<u64>)>,
    serving_sth: RefCell<Option<SignedTreeHead>>,
    node_states: RefCell<HashMap<String, ClusterNodeState>>,
    unavailable: Cell<bool>,
}

impl MemoryConsistentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry to the pending set, replacing any entry with the same hash.
    pub fn add_pending_entry(&self, entry: LoggedEntry) {
        self.pending.borrow_mut().insert(*entry.hash(), entry);
    }

    /// Removes an entry from the pending set, returning whether it was present.
    pub fn remove_pending_entry(&self, hash: &Hash) -> bool {
        self.pending.borrow_mut().remove(hash).is_some()
    }

    /// Sets the tree head the cluster serves.
    pub fn set_serving_sth(&self, sth: SignedTreeHead) {
        *self.serving_sth.borrow_mut() = Some(sth);
    }

    /// Returns the current sequence mapping and its version.
    pub fn sequence_mapping(&self) -> (SequenceMapping, Option<u64>) {
        self.mapping.borrow().clone()
    }

    /// Makes every operation fail with [`StoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.get() {
            Err(StoreError::Unavailable("store marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ConsistentStore for MemoryConsistentStore {
    async fn next_available_sequence_number(&self) -> Result<SequenceNumber, StoreError> {
        self.check_available()?;
        let after_mapping = self
            .mapping
            .borrow()
            .0
            .max_sequence_number()
            .map_or(0, |n| n + 1);
        let serving_size = self
            .serving_sth
            .borrow()
            .as_ref()
            .map_or(0, |sth| sth.tree_size);
        Ok(after_mapping.max(serving_size))
    }

    async fn get_pending_entries(&self) -> Result<Vec<LoggedEntry>, StoreError> {
        self.check_available()?;
        Ok(self.pending.borrow().values().cloned().collect())
    }

    async fn get_sequence_mapping(&self) -> Result<EntryHandle<SequenceMapping>, StoreError> {
        self.check_available()?;
        let (mapping, version) = self.mapping.borrow().clone();
        Ok(EntryHandle::new(mapping, version))
    }

    async fn update_sequence_mapping(
        &self,
        mapping: &EntryHandle<SequenceMapping>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut stored = self.mapping.borrow_mut();
        if stored.1 != mapping.version() {
            return Err(StoreError::VersionMismatch {
                key: SEQUENCE_MAPPING_KEY.to_string(),
                expected: mapping.version(),
                found: stored.1,
            });
        }
        let next_version = stored.1.map_or(1, |v| v + 1);
        *stored = (mapping.entry().clone(), Some(next_version));
        Ok(())
    }

    async fn get_serving_sth(&self) -> Result<SignedTreeHead, StoreError> {
        self.check_available()?;
        self.serving_sth
            .borrow()
            .clone()
            .ok_or_else(|| StoreError::NotFound(SERVING_STH_KEY.to_string()))
    }

    async fn get_cluster_node_state(&self, node_id: &str) -> Result<ClusterNodeState, StoreError> {
        self.check_available()?;
        self.node_states
            .borrow()
            .get(node_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("node state for {node_id:?}")))
    }

    async fn set_cluster_node_state(&self, state: &ClusterNodeState) -> Result<(), StoreError> {
        self.check_available()?;
        self.node_states
            .borrow_mut()
            .insert(state.node_id.clone(), state.clone());
        Ok(())
    }
}
