// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Data types shared by the components of an
//! [RFC 6962](https://datatracker.ietf.org/doc/html/rfc6962) log cluster.

pub mod cluster;
pub mod entry;
pub mod signer;
pub mod tree_head;

pub use cluster::*;
pub use entry::*;
pub use signer::*;
pub use tree_head::*;

#[derive(thiserror::Error, Debug)]
pub enum CtError {
    #[error(transparent)]
    Signature(#[from] signature::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("invalid leaf data length: {0} bytes")]
    InvalidLeafLength(usize),
    #[error("unsupported signature algorithm: hash={hash}, signature={signature}")]
    UnsupportedAlgorithm { hash: u8, signature: u8 },
    #[error("malformed signature")]
    MalformedSignature,
    #[error("trailing data")]
    TrailingData,
}
