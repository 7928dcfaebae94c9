// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

use crate::{DatabaseError, StoreError};
use thiserror::Error;

/// An error returned by a sequencing or tree-building round.
///
/// Store and database errors are transient: nothing has been partially
/// applied, and the round can be retried. A fatal error means cluster or
/// local state violates an invariant, and the node must stop rather than
/// risk signing an inconsistent tree.
#[derive(Error, Debug)]
pub enum TreeSignerError {
    #[error("consistent store error: {0}")]
    Store(#[from] StoreError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl TreeSignerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
