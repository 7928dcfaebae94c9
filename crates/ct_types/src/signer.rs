// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Tree head signing and verification.
//!
//! Signatures are encoded as a TLS `DigitallySigned` struct
//! ([RFC 5246 section 4.7](https://datatracker.ietf.org/doc/html/rfc5246#section-4.7)):
//!
//! ```text
//! struct {
//!     HashAlgorithm hash;
//!     SignatureAlgorithm signature;
//!     opaque signature<0..2^16-1>;
//! } DigitallySigned;
//! ```

use crate::{CtError, SignedTreeHead};
use byteorder::ReadBytesExt;
use ed25519_dalek::{
    Signature as Ed25519Signature, SigningKey as Ed25519SigningKey,
    VerifyingKey as Ed25519VerifyingKey,
};
use length_prefixed::{ReadLengthPrefixedBytesExt, WriteLengthPrefixedBytesExt};
use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature as EcdsaSignature, SigningKey as EcdsaSigningKey,
    VerifyingKey as EcdsaVerifyingKey,
};
use std::io::Cursor;

const HASH_ALG_SHA256: u8 = 4;
const HASH_ALG_INTRINSIC: u8 = 8;
const SIG_ALG_ECDSA: u8 = 3;
const SIG_ALG_ED25519: u8 = 7;

/// Signs tree heads on behalf of the log.
pub trait TreeHeadSigner {
    /// Signs `sth` over its [`SignedTreeHead::signature_input`], populating
    /// `tree_head_signature` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying signing operation fails.
    fn sign_tree_head(&self, sth: &mut SignedTreeHead) -> Result<(), CtError>;
}

/// Verifies tree head signatures produced by a [`TreeHeadSigner`].
pub trait TreeHeadVerifier {
    /// # Errors
    ///
    /// Returns an error if the signature is malformed, uses a different
    /// algorithm, or does not verify.
    fn verify_tree_head(&self, sth: &SignedTreeHead) -> Result<(), CtError>;
}

fn digitally_signed(hash: u8, signature: u8, sig_bytes: &[u8]) -> Result<Vec<u8>, CtError> {
    let mut buffer = Vec::with_capacity(4 + sig_bytes.len());
    buffer.push(hash);
    buffer.push(signature);
    buffer.write_length_prefixed(sig_bytes, 2)?;
    Ok(buffer)
}

fn parse_digitally_signed(data: &[u8], hash: u8, signature: u8) -> Result<Vec<u8>, CtError> {
    let mut s = Cursor::new(data);
    let hash_alg = s.read_u8().map_err(|_| CtError::MalformedSignature)?;
    let sig_alg = s.read_u8().map_err(|_| CtError::MalformedSignature)?;
    if hash_alg != hash || sig_alg != signature {
        return Err(CtError::UnsupportedAlgorithm {
            hash: hash_alg,
            signature: sig_alg,
        });
    }
    let sig_bytes = s
        .read_length_prefixed(2)
        .map_err(|_| CtError::MalformedSignature)?;
    if s.position() != data.len() as u64 {
        return Err(CtError::TrailingData);
    }
    Ok(sig_bytes)
}

/// Signs tree heads with ECDSA over P-256 and SHA-256, the algorithm RFC 6962
/// logs use.
pub struct EcdsaTreeHeadSigner {
    key: EcdsaSigningKey,
}

impl EcdsaTreeHeadSigner {
    pub fn new(key: EcdsaSigningKey) -> Self {
        Self { key }
    }

    pub fn verifier(&self) -> EcdsaTreeHeadVerifier {
        EcdsaTreeHeadVerifier::new(*self.key.verifying_key())
    }
}

impl TreeHeadSigner for EcdsaTreeHeadSigner {
    fn sign_tree_head(&self, sth: &mut SignedTreeHead) -> Result<(), CtError> {
        let sig: EcdsaSignature = self.key.try_sign(&sth.signature_input())?;
        sth.tree_head_signature =
            digitally_signed(HASH_ALG_SHA256, SIG_ALG_ECDSA, sig.to_der().as_bytes())?;
        Ok(())
    }
}

pub struct EcdsaTreeHeadVerifier {
    key: EcdsaVerifyingKey,
}

impl EcdsaTreeHeadVerifier {
    pub fn new(key: EcdsaVerifyingKey) -> Self {
        Self { key }
    }
}

impl TreeHeadVerifier for EcdsaTreeHeadVerifier {
    fn verify_tree_head(&self, sth: &SignedTreeHead) -> Result<(), CtError> {
        let der = parse_digitally_signed(&sth.tree_head_signature, HASH_ALG_SHA256, SIG_ALG_ECDSA)?;
        let sig = EcdsaSignature::from_der(&der)?;
        self.key.verify(&sth.signature_input(), &sig)?;
        Ok(())
    }
}

/// Signs tree heads with Ed25519.
pub struct Ed25519TreeHeadSigner {
    key: Ed25519SigningKey,
}

impl Ed25519TreeHeadSigner {
    pub fn new(key: Ed25519SigningKey) -> Self {
        Self { key }
    }

    pub fn verifier(&self) -> Ed25519TreeHeadVerifier {
        Ed25519TreeHeadVerifier::new(self.key.verifying_key())
    }
}

impl TreeHeadSigner for Ed25519TreeHeadSigner {
    fn sign_tree_head(&self, sth: &mut SignedTreeHead) -> Result<(), CtError> {
        let sig: Ed25519Signature = self.key.try_sign(&sth.signature_input())?;
        sth.tree_head_signature =
            digitally_signed(HASH_ALG_INTRINSIC, SIG_ALG_ED25519, &sig.to_bytes())?;
        Ok(())
    }
}

pub struct Ed25519TreeHeadVerifier {
    key: Ed25519VerifyingKey,
}

impl Ed25519TreeHeadVerifier {
    pub fn new(key: Ed25519VerifyingKey) -> Self {
        Self { key }
    }
}

impl TreeHeadVerifier for Ed25519TreeHeadVerifier {
    fn verify_tree_head(&self, sth: &SignedTreeHead) -> Result<(), CtError> {
        let raw = parse_digitally_signed(
            &sth.tree_head_signature,
            HASH_ALG_INTRINSIC,
            SIG_ALG_ED25519,
        )?;
        let sig = Ed25519Signature::from_slice(&raw)?;
        self.key.verify_strict(&sth.signature_input(), &sig)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use tlog_core::record_hash;

    fn test_sth() -> SignedTreeHead {
        SignedTreeHead {
            tree_size: 12,
            timestamp: 1_000,
            sha256_root_hash: record_hash(b"root"),
            ..Default::default()
        }
    }

    #[test]
    fn test_ecdsa_sign_verify() {
        let signer = EcdsaTreeHeadSigner::new(EcdsaSigningKey::random(&mut OsRng));
        let mut sth = test_sth();
        signer.sign_tree_head(&mut sth).unwrap();
        assert_eq!(sth.tree_head_signature[..2], [HASH_ALG_SHA256, SIG_ALG_ECDSA]);
        signer.verifier().verify_tree_head(&sth).unwrap();

        sth.timestamp += 1;
        assert!(matches!(
            signer.verifier().verify_tree_head(&sth),
            Err(CtError::Signature(_))
        ));
    }

    #[test]
    fn test_ed25519_sign_verify() {
        let signer = Ed25519TreeHeadSigner::new(Ed25519SigningKey::generate(&mut OsRng));
        let mut sth = test_sth();
        signer.sign_tree_head(&mut sth).unwrap();
        assert_eq!(
            sth.tree_head_signature[..4],
            [HASH_ALG_INTRINSIC, SIG_ALG_ED25519, 0, 64]
        );
        signer.verifier().verify_tree_head(&sth).unwrap();

        sth.tree_size += 1;
        assert!(signer.verifier().verify_tree_head(&sth).is_err());
    }

    #[test]
    fn test_wrong_algorithm() {
        let ecdsa = EcdsaTreeHeadSigner::new(EcdsaSigningKey::random(&mut OsRng));
        let ed25519 = Ed25519TreeHeadSigner::new(Ed25519SigningKey::generate(&mut OsRng));
        let mut sth = test_sth();
        ecdsa.sign_tree_head(&mut sth).unwrap();
        assert!(matches!(
            ed25519.verifier().verify_tree_head(&sth),
            Err(CtError::UnsupportedAlgorithm {
                hash: HASH_ALG_SHA256,
                signature: SIG_ALG_ECDSA
            })
        ));
    }

    #[test]
    fn test_malformed_signatures() {
        let signer = EcdsaTreeHeadSigner::new(EcdsaSigningKey::random(&mut OsRng));
        let verifier = signer.verifier();
        let mut sth = test_sth();

        assert!(matches!(
            verifier.verify_tree_head(&sth),
            Err(CtError::MalformedSignature)
        ));

        signer.sign_tree_head(&mut sth).unwrap();
        sth.tree_head_signature.push(0);
        assert!(matches!(
            verifier.verify_tree_head(&sth),
            Err(CtError::TrailingData)
        ));

        sth.tree_head_signature.truncate(10);
        assert!(matches!(
            verifier.verify_tree_head(&sth),
            Err(CtError::MalformedSignature)
        ));
    }
}
