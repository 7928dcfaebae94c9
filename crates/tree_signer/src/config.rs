// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Configuration for a [`TreeSigner`](crate::TreeSigner).

use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

#[serde_as]
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TreeSignerConfig {
    /// Name of the log, used to prefix log messages.
    pub name: String,
    /// Identifier of this node, written into the node state it publishes.
    #[serde(default)]
    pub node_id: String,
    /// Pending entries younger than this are left for a later round, so that
    /// all nodes have had a chance to make them visible in the pending set.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "guard_window_millis", default = "default_guard_window")]
    pub guard_window: Duration,
}

fn default_guard_window() -> Duration {
    Duration::from_secs(60)
}

impl TreeSignerConfig {
    pub fn new(name: impl Into<String>, node_id: impl Into<String>, guard_window: Duration) -> Self {
        Self {
            name: name.into(),
            node_id: node_id.into(),
            guard_window,
        }
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has missing or unknown fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns the guard window in milliseconds, saturating.
    pub(crate) fn guard_window_millis(&self) -> u64 {
        u64::try_from(self.guard_window.as_millis()).unwrap_or(u64::MAX)
    }
}
