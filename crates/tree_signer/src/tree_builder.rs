// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Incorporation of sequenced entries into the Merkle tree.

use crate::{
    metrics::AsF64, ConsistentStore, Database, DatabaseError, TreeSigner, TreeSignerError,
};
use ct_types::{LoggedEntry, SignedTreeHead, TreeHeadSigner};
use log::{error, info, warn};

/// Result of [`TreeSigner::append`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Another entry already holds this sequence number in the local
    /// database. Neither the database nor the tree was changed.
    SequenceNumberInUse,
}

impl<D, S, K> TreeSigner<'_, D, S, K>
where
    D: Database,
    S: ConsistentStore,
    K: TreeHeadSigner + ?Sized,
{
    /// Appends every contiguous sequenced entry from the local database to
    /// the tree, then signs and returns a new tree head.
    ///
    /// The new tree head is timestamped later than the previous one and no
    /// earlier than any entry it covers.
    ///
    /// # Errors
    ///
    /// Returns database errors unchanged, and a fatal error if signing fails.
    pub async fn update_tree(&mut self) -> Result<SignedTreeHead, TreeSignerError> {
        let result = self.build_and_sign().await;
        let label = match &result {
            Ok(_) => "none",
            Err(e) if e.is_fatal() => "fatal",
            Err(e) => {
                warn!("{}: Failed to update tree: {e}", self.config.name);
                "non-fatal"
            }
        };
        self.metrics
            .tree_update_count
            .with_label_values(&[label])
            .inc();
        result
    }

    async fn build_and_sign(&mut self) -> Result<SignedTreeHead, TreeSignerError> {
        let old_size = self.cert_tree.leaf_count();
        let mut min_timestamp = self.last_update_time() + 1;

        let scan = self.db.scan_entries(old_size).await?;
        for entry in scan {
            let entry = entry?;
            // Stop at the first gap.
            if entry.sequence_number() != Some(self.cert_tree.leaf_count()) {
                break;
            }
            self.append_to_tree(&entry);
            min_timestamp = min_timestamp.max(entry.timestamp());
        }

        let sth = self.timestamp_and_sign(min_timestamp)?;
        self.latest_tree_head = sth.clone();

        self.metrics.tree_size.set(sth.tree_size.as_f64());
        self.metrics.tree_time.set(sth.timestamp.as_f64() / 1000.0);
        info!(
            "{}: Updated tree; tree_size={}, entries: {}, timestamp: {}",
            self.config.name,
            sth.tree_size,
            sth.tree_size - old_size,
            sth.timestamp
        );
        Ok(sth)
    }

    /// Appends a sequenced entry to the tree without touching the local
    /// database, returning its leaf index.
    pub fn append_to_tree(&mut self, entry: &LoggedEntry) -> u64 {
        self.cert_tree.add_leaf(&entry.merkle_tree_leaf())
    }

    /// Stores a sequenced entry in the local database, then appends it to the
    /// tree.
    ///
    /// # Errors
    ///
    /// Returns a fatal error if the entry's sequence number is not the next
    /// leaf index, and database errors other than a sequence number
    /// collision unchanged.
    pub async fn append(&mut self, entry: &LoggedEntry) -> Result<AppendOutcome, TreeSignerError> {
        let name = &self.config.name;
        let expected = self.cert_tree.leaf_count();
        if entry.sequence_number() != Some(expected) {
            error!(
                "{name}: Entry sequence number {:?} does not match next leaf index {expected}",
                entry.sequence_number()
            );
            return Err(TreeSignerError::Fatal(format!(
                "entry sequence number {:?} does not match next leaf index {expected}",
                entry.sequence_number()
            )));
        }
        match self.db.create_sequenced_entry(entry).await {
            Ok(()) => {}
            Err(DatabaseError::SequenceNumberAlreadyInUse(n)) => {
                error!(
                    "{name}: Attempt to add duplicate sequence number {n}; hash={}",
                    entry.hash()
                );
                return Ok(AppendOutcome::SequenceNumberInUse);
            }
            Err(e) => return Err(e.into()),
        }
        self.append_to_tree(entry);
        Ok(AppendOutcome::Appended)
    }
}
