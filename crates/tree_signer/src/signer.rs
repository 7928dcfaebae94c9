// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! The tree signer: per-node state shared by sequencing and tree building,
//! recovery of that state, and tree head signing.

use crate::{
    metrics::{AsF64, SequencerMetrics},
    util::now_millis,
    ConsistentStore, Database, StoreError, TreeSignerConfig, TreeSignerError,
};
use ct_types::{ClusterNodeState, SignedTreeHead, TreeHeadSigner, UnixTimestamp, Version};
use log::{debug, error, info, warn};
use prometheus::Registry;
use tlog_core::CompactMerkleTree;

/// Sequences pending entries, builds the node's Merkle tree from the local
/// database, and signs tree heads.
///
/// Rounds take `&mut self` or are otherwise driven by a single caller, so a
/// `TreeSigner` never runs two rounds concurrently. Nodes of a cluster each
/// run their own `TreeSigner` against a shared [`ConsistentStore`].
pub struct TreeSigner<'a, D, S, K>
where
    D: Database,
    S: ConsistentStore,
    K: TreeHeadSigner + ?Sized,
{
    pub(crate) config: TreeSignerConfig,
    pub(crate) db: &'a D,
    pub(crate) store: &'a S,
    pub(crate) signer: &'a K,
    pub(crate) cert_tree: CompactMerkleTree,
    pub(crate) latest_tree_head: SignedTreeHead,
    pub(crate) metrics: SequencerMetrics,
}

impl<'a, D, S, K> TreeSigner<'a, D, S, K>
where
    D: Database,
    S: ConsistentStore,
    K: TreeHeadSigner + ?Sized,
{
    /// Returns a tree signer that resumes from the tree head this node last
    /// published, if any.
    ///
    /// `merkle_tree` holds the leaves already incorporated, and is normally
    /// empty: the next [`update_tree`](Self::update_tree) rebuilds it from the
    /// local database.
    ///
    /// # Errors
    ///
    /// Returns a fatal error if the node's previous state exists but cannot be
    /// read.
    ///
    /// # Panics
    ///
    /// Panics if the metrics cannot be registered with `registry`.
    pub async fn new(
        config: TreeSignerConfig,
        db: &'a D,
        store: &'a S,
        signer: &'a K,
        merkle_tree: CompactMerkleTree,
        registry: &Registry,
    ) -> Result<Self, TreeSignerError> {
        let name = &config.name;
        let latest_tree_head = match store.get_cluster_node_state(&config.node_id).await {
            Ok(state) => {
                let sth = state.newest_sth.unwrap_or_default();
                info!(
                    "{name}: Recovered node state; tree_size={}, timestamp={}",
                    sth.tree_size, sth.timestamp
                );
                sth
            }
            Err(StoreError::NotFound(_)) => {
                info!("{name}: No previous node state, starting fresh");
                SignedTreeHead::default()
            }
            Err(e) => {
                error!("{name}: Problem fetching this node's previous state: {e}");
                return Err(TreeSignerError::Fatal(format!(
                    "problem fetching this node's previous state: {e}"
                )));
            }
        };

        let metrics = SequencerMetrics::new(registry);
        metrics.tree_size.set(latest_tree_head.tree_size.as_f64());
        metrics
            .tree_time
            .set(latest_tree_head.timestamp.as_f64() / 1000.0);

        Ok(Self {
            config,
            db,
            store,
            signer,
            cert_tree: merkle_tree,
            latest_tree_head,
            metrics,
        })
    }

    pub fn config(&self) -> &TreeSignerConfig {
        &self.config
    }

    /// The timestamp of the latest tree head this node signed or recovered.
    pub fn last_update_time(&self) -> UnixTimestamp {
        self.latest_tree_head.timestamp
    }

    pub fn latest_tree_head(&self) -> &SignedTreeHead {
        &self.latest_tree_head
    }

    /// Returns the number of leaves incorporated into the in-memory tree.
    pub fn tree_size(&self) -> u64 {
        self.cert_tree.leaf_count()
    }

    /// Returns a new tree head for the current tree, timestamped no earlier
    /// than `min_timestamp`.
    ///
    /// This does not change the latest tree head.
    ///
    /// # Errors
    ///
    /// Returns a fatal error if signing fails.
    pub fn timestamp_and_sign(
        &self,
        min_timestamp: UnixTimestamp,
    ) -> Result<SignedTreeHead, TreeSignerError> {
        let name = &self.config.name;
        let now = now_millis();
        let timestamp = if now < min_timestamp {
            warn!("{name}: Clock is behind; timestamp={now}, min_timestamp={min_timestamp}");
            self.metrics.tree_clamped_timestamps.inc();
            min_timestamp
        } else {
            now
        };
        let mut sth = SignedTreeHead {
            version: Version::V1,
            tree_size: self.cert_tree.leaf_count(),
            timestamp,
            sha256_root_hash: self.cert_tree.current_root(),
            tree_head_signature: Vec::new(),
        };
        if let Err(e) = self.signer.sign_tree_head(&mut sth) {
            error!("{name}: Failed to sign tree head: {e}");
            return Err(TreeSignerError::Fatal(format!(
                "failed to sign tree head: {e}"
            )));
        }
        debug!(
            "{name}: Signed tree head; tree_size={}, timestamp={timestamp}, root={}",
            sth.tree_size, sth.sha256_root_hash
        );
        Ok(sth)
    }

    /// Publishes the latest tree head as this node's state, making it
    /// available for recovery and as a candidate serving tree head.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn publish_node_state(&self) -> Result<(), TreeSignerError> {
        let state = ClusterNodeState {
            node_id: self.config.node_id.clone(),
            newest_sth: Some(self.latest_tree_head.clone()),
        };
        self.store.set_cluster_node_state(&state).await?;
        debug!(
            "{}: Published node state; tree_size={}",
            self.config.name, self.latest_tree_head.tree_size
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{FailingSigner, TestCluster},
        util,
    };
    use ct_types::TreeHeadVerifier;
    use futures_executor::block_on;
    use tlog_core::EMPTY_HASH;

    #[test]
    fn test_fresh_node() {
        let cluster = TestCluster::new();
        let signer = cluster.tree_signer("node-1");
        assert_eq!(signer.last_update_time(), 0);
        assert_eq!(*signer.latest_tree_head(), SignedTreeHead::default());
        assert_eq!(signer.tree_size(), 0);
    }

    #[test]
    fn test_recovers_published_state() {
        let cluster = TestCluster::new();
        let published = {
            let mut signer = cluster.tree_signer("node-1");
            cluster.add_pending(b"a", 0);
            block_on(signer.sequence_new_entries()).unwrap();
            block_on(signer.update_tree()).unwrap();
            block_on(signer.publish_node_state()).unwrap();
            signer.latest_tree_head().clone()
        };
        assert_eq!(published.tree_size, 1);

        let mut restarted = cluster.tree_signer("node-1");
        assert_eq!(*restarted.latest_tree_head(), published);
        assert_eq!(restarted.last_update_time(), published.timestamp);

        // The tree is rebuilt from the local database, and time moves forward.
        let sth = block_on(restarted.update_tree()).unwrap();
        assert_eq!(sth.tree_size, 1);
        assert_eq!(sth.sha256_root_hash, published.sha256_root_hash);
        assert!(sth.timestamp > published.timestamp);

        // Other nodes' state is separate.
        let other = cluster.tree_signer("node-2");
        assert_eq!(other.last_update_time(), 0);
    }

    #[test]
    fn test_recovery_store_error_is_fatal() {
        let cluster = TestCluster::new();
        cluster.store.set_unavailable(true);
        let result = block_on(TreeSigner::new(
            cluster.config("node-1"),
            cluster.db("node-1"),
            &cluster.store,
            &cluster.signer,
            CompactMerkleTree::new(),
            &Registry::new(),
        ));
        assert!(matches!(result, Err(TreeSignerError::Fatal(_))));
    }

    #[test]
    fn test_timestamp_and_sign() {
        let cluster = TestCluster::new();
        let signer = cluster.tree_signer("node-1");

        let _lock = util::TIME_MUX.lock();
        util::set_freeze_time(true);
        util::set_global_time(5_000);

        let sth = signer.timestamp_and_sign(0).unwrap();
        assert_eq!(sth.timestamp, 5_000);
        assert_eq!(sth.tree_size, 0);
        assert_eq!(sth.sha256_root_hash, EMPTY_HASH);
        cluster.verifier.verify_tree_head(&sth).unwrap();

        // The clock is raised to the minimum.
        let sth = signer.timestamp_and_sign(9_000).unwrap();
        assert_eq!(sth.timestamp, 9_000);
        cluster.verifier.verify_tree_head(&sth).unwrap();

        // Signing alone doesn't change the latest tree head.
        assert_eq!(signer.last_update_time(), 0);

        util::set_freeze_time(false);
    }

    #[test]
    fn test_signing_failure_is_fatal() {
        let cluster = TestCluster::new();
        let failing = FailingSigner;
        let signer = block_on(TreeSigner::new(
            cluster.config("node-1"),
            cluster.db("node-1"),
            &cluster.store,
            &failing,
            CompactMerkleTree::new(),
            &Registry::new(),
        ))
        .unwrap();
        let err = signer.timestamp_and_sign(0).unwrap_err();
        assert!(err.is_fatal());
    }
}
