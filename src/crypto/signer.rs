//! Evaluator signing keys.
//!
//! Evaluators run off-system and here only as test/tooling participants, but
//! the crate ships the key wrapper so evaluator deployments and test
//! fixtures produce signatures in exactly the shape the validator expects:
//! 65-byte `r || s || v` over a keccak-256 prehash, with `v` emitted in
//! Ethereum's 27/28 convention.

use alloy_primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;

use crate::crypto::digest::{compute_legacy_digest, compute_structured_digest, VerifyingDomain};
use crate::domain::AttestedData;

/// Length of a recoverable ECDSA signature: `r (32) || s (32) || v (1)`.
pub const ECDSA_SIGNATURE_LEN: usize = 65;

/// Errors from key handling and signing.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// A secp256k1 signing key held by a score evaluator.
#[derive(Clone)]
pub struct EvaluatorSigningKey {
    signing_key: SigningKey,
}

impl EvaluatorSigningKey {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Restores a key from its 32-byte secret scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, SignerError> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|_| SignerError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// Exports the secret scalar. Handle with care.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// Ethereum address of the corresponding public key.
    pub fn address(&self) -> Address {
        verifying_key_address(self.signing_key.verifying_key())
    }

    /// Signs a 32-byte prehash, returning `r || s || v` with `v` in 27/28.
    pub fn sign_digest(&self, digest: &B256) -> Result<Vec<u8>, SignerError> {
        let (signature, recovery) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;
        let mut out = Vec::with_capacity(ECDSA_SIGNATURE_LEN);
        out.extend_from_slice(&signature.to_bytes());
        out.push(recovery.to_byte() + 27);
        Ok(out)
    }

    /// Signs the structured digest for one verifier deployment.
    pub fn sign_structured(
        &self,
        domain: &VerifyingDomain,
        attested: &AttestedData,
    ) -> Result<Vec<u8>, SignerError> {
        self.sign_digest(&compute_structured_digest(domain, attested))
    }

    /// Signs the legacy EIP-191 digest.
    pub fn sign_legacy(&self, attested: &AttestedData) -> Result<Vec<u8>, SignerError> {
        self.sign_digest(&compute_legacy_digest(attested))
    }
}

impl fmt::Debug for EvaluatorSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorSigningKey")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Recovers the signer address from a 32-byte prehash and an `r || s || v`
/// signature. Accepts `v` as 0/1 or 27/28. Returns `None` on any malformed
/// input; recovery never panics.
pub fn recover_address(digest: &B256, signature: &[u8]) -> Option<Address> {
    if signature.len() != ECDSA_SIGNATURE_LEN {
        return None;
    }
    let recovery = normalize_v(signature[64]).and_then(RecoveryId::from_byte)?;
    let signature = Signature::from_slice(&signature[..64]).ok()?;
    let recovered =
        VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery).ok()?;
    Some(verifying_key_address(&recovered))
}

/// Ethereum address of a public key: `keccak256(uncompressed[1..])[12..32]`.
pub fn verifying_key_address(key: &VerifyingKey) -> Address {
    let uncompressed = key.to_encoded_point(false);
    let digest = keccak256(&uncompressed.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}

fn normalize_v(v: u8) -> Option<u8> {
    match v {
        0 | 1 => Some(v),
        27 | 28 => Some(v - 27),
        _ => None,
    }
}
