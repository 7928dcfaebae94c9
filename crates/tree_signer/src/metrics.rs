// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Metrics for sequencing and tree head signing.

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry, Counter, CounterVec, Gauge,
    Histogram, Registry,
};

#[derive(Debug)]
pub(crate) struct SequencerMetrics {
    pub(crate) seq_count: CounterVec,
    pub(crate) seq_pending_entries: Histogram,
    pub(crate) seq_new_entries: Counter,
    pub(crate) seq_too_recent_entries: Counter,
    pub(crate) seq_dropped_entries: Counter,
    pub(crate) seq_duration: Histogram,

    pub(crate) tree_update_count: CounterVec,
    pub(crate) tree_size: Gauge,
    pub(crate) tree_time: Gauge,
    pub(crate) tree_clamped_timestamps: Counter,
}

impl SequencerMetrics {
    /// Registers the metrics with `r`.
    ///
    /// # Panics
    ///
    /// Panics if a metric with the same name is already registered with `r`.
    pub(crate) fn new(r: &Registry) -> Self {
        let seq_count = register_counter_vec_with_registry!(
            "sequencing_rounds_total",
            "Number of sequencing rounds, by error category if failed.",
            &["error"],
            r
        )
        .unwrap();
        let seq_pending_entries = register_histogram_with_registry!(
            "sequencing_pending_entries",
            "Number of pending entries considered per sequencing round.",
            vec![0.0, 1.0, 10.0, 100.0, 1000.0, 10000.0],
            r
        )
        .unwrap();
        let seq_new_entries = register_counter_with_registry!(
            "sequencing_new_entries_total",
            "Entries assigned a new sequence number.",
            r
        )
        .unwrap();
        let seq_too_recent_entries = register_counter_with_registry!(
            "sequencing_too_recent_entries_total",
            "Pending entries skipped because they were inside the guard window.",
            r
        )
        .unwrap();
        let seq_dropped_entries = register_counter_with_registry!(
            "sequencing_dropped_mappings_total",
            "Sequence mappings dropped after their entries left the pending set.",
            r
        )
        .unwrap();
        let seq_duration = register_histogram_with_registry!(
            "sequencing_duration_seconds",
            "Duration of sequencing rounds.",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            r
        )
        .unwrap();
        let tree_update_count = register_counter_vec_with_registry!(
            "tree_updates_total",
            "Number of tree updates, by error category if failed.",
            &["error"],
            r
        )
        .unwrap();
        let tree_size = register_gauge_with_registry!(
            "tree_size_leaves_total",
            "Size of the latest signed tree head.",
            r
        )
        .unwrap();
        let tree_time = register_gauge_with_registry!(
            "tree_timestamp_seconds",
            "Timestamp of the latest signed tree head.",
            r
        )
        .unwrap();
        let tree_clamped_timestamps = register_counter_with_registry!(
            "tree_clamped_timestamps_total",
            "Tree heads whose timestamp was raised above the local clock.",
            r
        )
        .unwrap();
        Self {
            seq_count,
            seq_pending_entries,
            seq_new_entries,
            seq_too_recent_entries,
            seq_dropped_entries,
            seq_duration,
            tree_update_count,
            tree_size,
            tree_time,
            tree_clamped_timestamps,
        }
    }
}

pub(crate) trait AsF64 {
    fn as_f64(&self) -> f64;
}

impl AsF64 for usize {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> f64 {
        *self as f64
    }
}

impl AsF64 for u64 {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> f64 {
        *self as f64
    }
}

pub(crate) fn millis_diff_as_secs(start: u64, end: u64) -> f64 {
    end.saturating_sub(start).as_f64() / 1000.0
}
