// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Shared fixtures for unit tests.

use crate::{MemoryConsistentStore, MemoryDatabase, TreeSigner, TreeSignerConfig};
use ct_types::{
    CtError, EcdsaTreeHeadSigner, EcdsaTreeHeadVerifier, LoggedEntry, SignedTreeHead,
    TreeHeadSigner,
};
use futures_executor::block_on;
use p256::ecdsa::SigningKey as EcdsaSigningKey;
use prometheus::Registry;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::time::Duration;
use tlog_core::{CompactMerkleTree, Hash};

pub(crate) const NODES: [&str; 3] = ["node-1", "node-2", "node-3"];

/// A cluster sharing one in-memory consistent store, with a local database
/// for each of [`NODES`].
pub(crate) struct TestCluster {
    pub(crate) store: MemoryConsistentStore,
    pub(crate) signer: EcdsaTreeHeadSigner,
    pub(crate) verifier: EcdsaTreeHeadVerifier,
    guard_window: Duration,
    dbs: HashMap<&'static str, MemoryDatabase>,
}

pub(crate) type TestTreeSigner<'a> =
    TreeSigner<'a, MemoryDatabase, MemoryConsistentStore, EcdsaTreeHeadSigner>;

impl TestCluster {
    pub(crate) fn new() -> Self {
        Self::with_guard_window(Duration::ZERO)
    }

    pub(crate) fn with_guard_window(guard_window: Duration) -> Self {
        let signer = EcdsaTreeHeadSigner::new(EcdsaSigningKey::random(&mut OsRng));
        let verifier = signer.verifier();
        Self {
            store: MemoryConsistentStore::new(),
            signer,
            verifier,
            guard_window,
            dbs: NODES.iter().map(|&id| (id, MemoryDatabase::new())).collect(),
        }
    }

    pub(crate) fn config(&self, node_id: &str) -> TreeSignerConfig {
        TreeSignerConfig::new("TestLog", node_id, self.guard_window)
    }

    pub(crate) fn db(&self, node_id: &str) -> &MemoryDatabase {
        &self.dbs[node_id]
    }

    /// Returns a tree signer for `node_id`, recovering any state it published.
    pub(crate) fn tree_signer(&self, node_id: &str) -> TestTreeSigner<'_> {
        block_on(TreeSigner::new(
            self.config(node_id),
            self.db(node_id),
            &self.store,
            &self.signer,
            CompactMerkleTree::new(),
            &Registry::new(),
        ))
        .unwrap()
    }

    /// Adds a pending entry and returns its hash.
    pub(crate) fn add_pending(&self, data: &[u8], timestamp: u64) -> Hash {
        let entry = LoggedEntry::new(data.to_vec(), timestamp).unwrap();
        let hash = *entry.hash();
        self.store.add_pending_entry(entry);
        hash
    }
}

pub(crate) struct FailingSigner;

impl TreeHeadSigner for FailingSigner {
    fn sign_tree_head(&self, _sth: &mut SignedTreeHead) -> Result<(), CtError> {
        Err(CtError::MalformedSignature)
    }
}
