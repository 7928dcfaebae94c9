// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Assignment of sequence numbers to pending entries.

use crate::{
    metrics::{millis_diff_as_secs, AsF64},
    ordering::pending_entries_order,
    util::now_millis,
    ConsistentStore, Database, DatabaseError, StoreError, TreeSigner, TreeSignerError,
};
use ct_types::{LoggedEntry, Mapping, SequenceNumber, TreeHeadSigner, UnixTimestamp};
use log::{debug, error, info, trace, warn};
use std::collections::{BTreeMap, HashMap};
use tlog_core::Hash;

/// What a sequencing round did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceSummary {
    /// Entries assigned a new sequence number.
    pub newly_sequenced: usize,
    /// Pending entries that already had a sequence number.
    pub previously_sequenced: usize,
    /// Pending entries left for a later round because of the guard window.
    pub too_recent: usize,
    /// Mappings dropped because their entries are covered by the serving
    /// tree head and left the pending set.
    pub dropped: usize,
}

impl<D, S, K> TreeSigner<'_, D, S, K>
where
    D: Database,
    S: ConsistentStore,
    K: TreeHeadSigner + ?Sized,
{
    /// Assigns sequence numbers to pending entries old enough to be visible
    /// to every node, records the assignment in the consistent store, and
    /// copies newly sequenced entries into the local database.
    ///
    /// # Errors
    ///
    /// Store and database errors are returned unchanged and leave the
    /// cluster state as it was. Violated invariants of the cluster or local
    /// state are returned as [`TreeSignerError::Fatal`].
    pub async fn sequence_new_entries(&self) -> Result<SequenceSummary, TreeSignerError> {
        let start = now_millis();
        let result = self.sequence_pending_entries(start).await;
        match &result {
            Ok(summary) => {
                self.metrics.seq_count.with_label_values(&["none"]).inc();
                self.metrics
                    .seq_new_entries
                    .inc_by(summary.newly_sequenced.as_f64());
                self.metrics
                    .seq_too_recent_entries
                    .inc_by(summary.too_recent.as_f64());
                self.metrics
                    .seq_dropped_entries
                    .inc_by(summary.dropped.as_f64());
                info!(
                    "{}: Sequenced entries; new={}, existing={}, too_recent={}, dropped={}, duration: {:.2}s",
                    self.config.name,
                    summary.newly_sequenced,
                    summary.previously_sequenced,
                    summary.too_recent,
                    summary.dropped,
                    millis_diff_as_secs(start, now_millis())
                );
            }
            Err(e) if e.is_fatal() => {
                self.metrics.seq_count.with_label_values(&["fatal"]).inc();
                error!("{}: Fatal sequencing error {e}", self.config.name);
            }
            Err(e) => {
                self.metrics.seq_count.with_label_values(&["non-fatal"]).inc();
                warn!("{}: Non-fatal sequencing error {e}", self.config.name);
            }
        }
        self.metrics
            .seq_duration
            .observe(millis_diff_as_secs(start, now_millis()));
        result
    }

    async fn sequence_pending_entries(
        &self,
        now: UnixTimestamp,
    ) -> Result<SequenceSummary, TreeSignerError> {
        let name = &self.config.name;
        let mut summary = SequenceSummary::default();

        let mut next_sequence_number = self.store.next_available_sequence_number().await?;
        debug!("{name}: Next available sequence number: {next_sequence_number}");

        let mut mapping = self.store.get_sequence_mapping().await?;

        // Sequence numbers already assigned, and whether the entry has been
        // seen in this round's pending set.
        let mut sequenced_hashes: HashMap<Hash, (SequenceNumber, bool)> =
            HashMap::with_capacity(mapping.entry().mappings.len());
        for m in &mapping.entry().mappings {
            if sequenced_hashes
                .insert(m.entry_hash, (m.sequence_number, false))
                .is_some()
            {
                return Err(TreeSignerError::Fatal(format!(
                    "hash {} is mapped more than once",
                    m.entry_hash
                )));
            }
        }

        let mut pending_entries = self.store.get_pending_entries().await?;
        pending_entries.sort_by(pending_entries_order);
        self.metrics
            .seq_pending_entries
            .observe(pending_entries.len().as_f64());
        debug!("{name}: Considering {} pending entries", pending_entries.len());

        let guard_window = self.config.guard_window_millis();
        let mut new_mappings = Vec::with_capacity(pending_entries.len());
        let mut seq_to_entry: BTreeMap<SequenceNumber, LoggedEntry> = BTreeMap::new();
        for mut entry in pending_entries {
            // Entries from the future are also too recent.
            if now.saturating_sub(entry.timestamp()) < guard_window {
                trace!("{name}: Entry too recent; hash={}", entry.hash());
                summary.too_recent += 1;
                continue;
            }
            if let Some(sequence_number) = entry.sequence_number() {
                return Err(TreeSignerError::Fatal(format!(
                    "pending entry {} already carries sequence number {sequence_number}",
                    entry.hash()
                )));
            }

            let sequence_number = match sequenced_hashes.get_mut(entry.hash()) {
                Some((_, true)) => {
                    return Err(TreeSignerError::Fatal(format!(
                        "saw pending entry {} twice",
                        entry.hash()
                    )));
                }
                Some((sequence_number, seen)) => {
                    *seen = true;
                    summary.previously_sequenced += 1;
                    trace!(
                        "{name}: Previously sequenced; hash={}, sequence_number={sequence_number}",
                        entry.hash()
                    );
                    *sequence_number
                }
                None => {
                    let sequence_number = next_sequence_number;
                    next_sequence_number += 1;
                    sequenced_hashes.insert(*entry.hash(), (sequence_number, true));
                    summary.newly_sequenced += 1;
                    trace!(
                        "{name}: Sequenced; hash={}, sequence_number={sequence_number}",
                        entry.hash()
                    );
                    sequence_number
                }
            };

            new_mappings.push(Mapping {
                entry_hash: *entry.hash(),
                sequence_number,
            });
            entry.set_sequence_number(sequence_number);
            if seq_to_entry.insert(sequence_number, entry).is_some() {
                return Err(TreeSignerError::Fatal(format!(
                    "sequence number {sequence_number} assigned to two entries"
                )));
            }
        }

        let serving_tree_size = match self.store.get_serving_sth().await {
            Ok(sth) => sth.tree_size,
            Err(StoreError::NotFound(_)) => 0,
            Err(e) => {
                warn!("{name}: Failed to get serving STH: {e}");
                return Err(e.into());
            }
        };
        let local_tree_size = self.db.tree_size().await?;

        // Mapped entries missing from the pending set must be covered by the
        // serving tree head, and so already incorporated by every node.
        for (hash, (sequence_number, seen)) in &sequenced_hashes {
            if *seen {
                continue;
            }
            if *sequence_number >= serving_tree_size {
                return Err(TreeSignerError::Fatal(format!(
                    "entry {hash} with sequence number {sequence_number} left the pending set but is not covered by the serving tree size {serving_tree_size}"
                )));
            }
            if *sequence_number < local_tree_size {
                self.check_local_entry(hash, *sequence_number).await?;
            }
            summary.dropped += 1;
        }

        new_mappings.sort_by_key(|m| m.sequence_number);
        if let Some(first) = new_mappings.first() {
            if first.sequence_number > serving_tree_size {
                return Err(TreeSignerError::Fatal(format!(
                    "lowest mapped sequence number {} is beyond the serving tree size {serving_tree_size}",
                    first.sequence_number
                )));
            }
        }

        mapping.entry_mut().mappings = new_mappings;
        self.store.update_sequence_mapping(&mapping).await?;

        // Only extend the local database contiguously from its tree size. A
        // node that is missing an earlier entry stores nothing this round.
        let mut next_local = local_tree_size;
        while let Some(entry) = seq_to_entry.get(&next_local) {
            trace!("{name}: Adding to local database; sequence_number={next_local}");
            match self.db.create_sequenced_entry(entry).await {
                Ok(()) => {}
                Err(DatabaseError::SequenceNumberAlreadyInUse(n)) => {
                    self.check_local_entry(entry.hash(), n).await?;
                }
                Err(e) => return Err(e.into()),
            }
            next_local += 1;
        }

        Ok(summary)
    }

    /// Checks that the locally stored entry at `sequence_number` is the one
    /// the cluster mapped there.
    async fn check_local_entry(
        &self,
        hash: &Hash,
        sequence_number: SequenceNumber,
    ) -> Result<(), TreeSignerError> {
        match self.db.get_entry(sequence_number).await? {
            Some(local) if local.hash() == hash => Ok(()),
            Some(local) => Err(TreeSignerError::Fatal(format!(
                "local entry {} at sequence number {sequence_number} does not match mapped entry {hash}",
                local.hash()
            ))),
            None => Err(TreeSignerError::Fatal(format!(
                "local database is missing sequence number {sequence_number} below its tree size"
            ))),
        }
    }
}
