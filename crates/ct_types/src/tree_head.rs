// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Signed tree heads.
//!
//! References:
//! - [RFC 6962 section 3.5](https://datatracker.ietf.org/doc/html/rfc6962#section-3.5)

use crate::UnixTimestamp;
use byteorder::{BigEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use tlog_core::{Hash, EMPTY_HASH};

/// Version of the tree head structure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Version {
    #[default]
    V1,
}

impl From<Version> for u8 {
    fn from(value: Version) -> Self {
        match value {
            Version::V1 => 0,
        }
    }
}

/// A tree head, signed once `tree_head_signature` is populated.
///
/// Serializes in the shape of an RFC 6962 `get-sth` response.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTreeHead {
    #[serde(skip)]
    pub version: Version,
    pub tree_size: u64,
    pub timestamp: UnixTimestamp,
    pub sha256_root_hash: Hash,
    #[serde_as(as = "Base64")]
    pub tree_head_signature: Vec<u8>,
}

impl Default for SignedTreeHead {
    /// The unsigned head of an empty tree at timestamp zero.
    fn default() -> Self {
        Self {
            version: Version::V1,
            tree_size: 0,
            timestamp: 0,
            sha256_root_hash: EMPTY_HASH,
            tree_head_signature: Vec::new(),
        }
    }
}

impl SignedTreeHead {
    /// Returns the bytes covered by the tree head signature.
    ///
    /// ```text
    /// digitally-signed struct {
    ///     Version version;
    ///     SignatureType signature_type = tree_hash;
    ///     uint64 timestamp;
    ///     uint64 tree_size;
    ///     opaque sha256_root_hash[32];
    /// } TreeHeadSignature;
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if writing to the internal buffer fails, which should never happen.
    pub fn signature_input(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(2 + 8 + 8 + 32);
        buffer.push(self.version.into());
        buffer.push(1); // signature_type = tree_hash (1)
        buffer.write_u64::<BigEndian>(self.timestamp).unwrap();
        buffer.write_u64::<BigEndian>(self.tree_size).unwrap();
        buffer.extend_from_slice(&self.sha256_root_hash.0);
        buffer
    }

    pub fn is_signed(&self) -> bool {
        !self.tree_head_signature.is_empty()
    }
}
