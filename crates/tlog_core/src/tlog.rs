// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! RFC 6962 Merkle tree hashing.
//!
//! References:
//! - [RFC 6962 section 2.1](https://datatracker.ietf.org/doc/html/rfc6962#section-2.1)

use base64::prelude::*;
use serde::{
    de::{self, Visitor},
    Deserialize, Serialize, Serializer,
};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// `HASH_SIZE` is the size of a Hash in bytes.
pub const HASH_SIZE: usize = 32;

/// A SHA-256 hash identifying a log entry, a leaf, or a tree root.
///
/// Ordering is byte-lexicographic.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(pub [u8; HASH_SIZE]);

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64_STANDARD.encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(value: [u8; HASH_SIZE]) -> Self {
        Hash(value)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct HashVisitor;

        impl Visitor<'_> for HashVisitor {
            type Value = Hash;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a base64-encoded 32-byte hash")
            }

            fn visit_str<E>(self, value: &str) -> Result<Hash, E>
            where
                E: de::Error,
            {
                Hash::parse_hash(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(HashVisitor)
    }
}

impl Hash {
    /// Returns a new Hash with contents decoded from the given base64-encoded string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid base64 or does not decode
    /// to exactly `HASH_SIZE` bytes.
    pub fn parse_hash(s: &str) -> Result<Self, TlogError> {
        let data = BASE64_STANDARD.decode(s)?;
        Ok(Hash(data.try_into().map_err(|_| TlogError::MalformedHash)?))
    }

    /// Returns the SHA-256 digest of `data` with no domain separation prefix.
    pub fn digest(data: &[u8]) -> Self {
        Hash(Sha256::digest(data).into())
    }
}

/// The root hash of an empty tree, `SHA256()`.
pub const EMPTY_HASH: Hash = Hash([
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
    0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
]);

/// Returns the leaf hash for the given leaf data.
pub fn record_hash(data: &[u8]) -> Hash {
    // SHA256(0x00 || data)
    let mut hasher = Sha256::new();
    hasher.update([0x00]);
    hasher.update(data);
    Hash(hasher.finalize().into())
}

/// Returns the hash for an interior tree node with the given left and right hashes.
pub fn node_hash(left: Hash, right: Hash) -> Hash {
    // SHA256(0x01 || left || right)
    let mut hasher = Sha256::new();
    hasher.update([0x01]);
    hasher.update(left.0);
    hasher.update(right.0);
    Hash(hasher.finalize().into())
}

/// Computes the Merkle Tree Hash of a list of leaf hashes directly from the
/// recursive definition in RFC 6962, splitting at the largest power of two
/// strictly below the number of leaves.
///
/// This needs the whole list in memory; use
/// [`CompactMerkleTree`](crate::CompactMerkleTree) for incremental appends.
pub fn root_hash(leaf_hashes: &[Hash]) -> Hash {
    match leaf_hashes {
        [] => EMPTY_HASH,
        [leaf] => *leaf,
        _ => {
            let k = 1 << (leaf_hashes.len() - 1).ilog2();
            let (left, right) = leaf_hashes.split_at(k);
            node_hash(root_hash(left), root_hash(right))
        }
    }
}

#[derive(Error, Debug)]
pub enum TlogError {
    #[error("malformed hash")]
    MalformedHash,
    #[error(transparent)]
    InvalidBase64(#[from] base64::DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> Hash {
        Hash(hex::decode(s).unwrap().try_into().unwrap())
    }

    // Leaf inputs from the RFC 6962 reference test suite.
    fn test_leaves() -> Vec<Vec<u8>> {
        vec![
            vec![],
            vec![0x00],
            vec![0x10],
            vec![0x20, 0x21],
            vec![0x30, 0x31],
            vec![0x40, 0x41, 0x42, 0x43],
            vec![0x50, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56, 0x57],
            (0x60..=0x6f).collect(),
        ]
    }

    #[test]
    fn test_empty_hash() {
        assert_eq!(EMPTY_HASH, Hash::digest(b""));
        assert_eq!(root_hash(&[]), EMPTY_HASH);
    }

    #[test]
    fn test_known_roots() {
        let leaves: Vec<Hash> = test_leaves().iter().map(|l| record_hash(l)).collect();
        assert_eq!(
            root_hash(&leaves[..1]),
            h("6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d")
        );
        assert_eq!(
            root_hash(&leaves[..2]),
            h("fac54203e7cc696cf0dfcb42c92a1d9dbaf70ad9e621f4bd8d98662f00e3c125")
        );
        assert_eq!(
            root_hash(&leaves),
            h("5dc9da79a70659a9ad559cb701ded9a2ab9d823aad2f4960cfe370eff4604328")
        );
    }

    #[test]
    fn test_root_hash_split() {
        let leaves: Vec<Hash> = (0u8..5).map(|i| record_hash(&[i])).collect();
        let expected = node_hash(
            node_hash(
                node_hash(leaves[0], leaves[1]),
                node_hash(leaves[2], leaves[3]),
            ),
            leaves[4],
        );
        assert_eq!(root_hash(&leaves), expected);
    }

    #[test]
    fn test_hash_base64() {
        let hash = record_hash(b"hello");
        let parsed = Hash::parse_hash(&hash.to_string()).unwrap();
        assert_eq!(parsed, hash);

        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);

        assert!(matches!(
            Hash::parse_hash(&BASE64_STANDARD.encode([1u8; 31])),
            Err(TlogError::MalformedHash)
        ));
        assert!(Hash::parse_hash("not base64!").is_err());
        assert!(serde_json::from_str::<Hash>("\"AAAA\"").is_err());
    }

    #[test]
    fn test_hash_ordering() {
        let mut a = [0u8; HASH_SIZE];
        let mut b = [0u8; HASH_SIZE];
        a[0] = 1;
        b[31] = 0xff;
        assert!(Hash(b) < Hash(a));
    }
}
