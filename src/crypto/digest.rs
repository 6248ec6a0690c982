//! Canonical digests and deterministic derivations.
//!
//! Every hash the verifier produces is keccak-256 over a domain-tagged
//! preimage. The tags keep attestation digests, bypass salts, account salts,
//! and deposit identifiers from ever colliding, even when the remaining
//! fields happen to match byte for byte.
//!
//! Two digest forms exist for attestations:
//! - the structured digest, bound to the verifier's network and address, and
//! - the legacy digest, an EIP-191 wrap of the bare attested fields, kept so
//!   older evaluator deployments keep working during migration.

use alloy_primitives::{Address, Keccak256, B256};

use crate::domain::{AttestedData, OperationKey};

// ============================================================================
// Domain separation tags
// ============================================================================

/// Tag for structured attestation digests.
pub const DOMAIN_ATTESTATION: &[u8] = b"SCORELOCK_ATTESTATION_V1";

/// Tag for bypass-window custody salts.
pub const DOMAIN_BYPASS_SALT: &[u8] = b"SCORELOCK_BYPASS_SALT_V1";

/// Tag for owner-scoped account salts.
pub const DOMAIN_ACCOUNT_SALT: &[u8] = b"SCORELOCK_ACCOUNT_SALT_V1";

/// Tag for delayed-deposit identifiers.
pub const DOMAIN_DEPOSIT: &[u8] = b"SCORELOCK_DEPOSIT_V1";

/// EIP-191 prefix for signatures over a 32-byte hash.
pub const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Identity of one verifier deployment. Structured digests commit to it, so
/// an attestation signed for one deployment never verifies on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyingDomain {
    /// Network the verifier serves.
    pub network_id: u64,
    /// Address the verifier is known by.
    pub verifier: Address,
}

// ============================================================================
// Encoding helpers
// ============================================================================

/// Encodes a u16 as big-endian bytes.
#[inline]
pub fn u16_be(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

/// Encodes a u64 as big-endian bytes.
#[inline]
pub fn u64_be(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

/// Encodes a u128 as big-endian bytes.
#[inline]
pub fn u128_be(v: u128) -> [u8; 16] {
    v.to_be_bytes()
}

// ============================================================================
// Digest computation
// ============================================================================

/// Computes the structured attestation digest.
///
/// ```text
/// digest = keccak256(
///     DOMAIN_ATTESTATION ||
///     u64_be(domain.network_id) ||
///     domain.verifier ||
///     u16_be(attested.score) ||
///     u64_be(attested.issued_at) ||
///     u64_be(attested.network_id)
/// )
/// ```
pub fn compute_structured_digest(domain: &VerifyingDomain, attested: &AttestedData) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(DOMAIN_ATTESTATION);
    hasher.update(u64_be(domain.network_id));
    hasher.update(domain.verifier.as_slice());
    hasher.update(u16_be(attested.score));
    hasher.update(u64_be(attested.issued_at));
    hasher.update(u64_be(attested.network_id));
    hasher.finalize()
}

/// Computes the legacy attestation digest.
///
/// ```text
/// inner  = keccak256(u16_be(score) || u64_be(issued_at) || u64_be(network_id))
/// digest = keccak256("\x19Ethereum Signed Message:\n32" || inner)
/// ```
///
/// Carries no verifier binding; accepted only as a fallback after the
/// structured digest fails to recover the trusted signer.
pub fn compute_legacy_digest(attested: &AttestedData) -> B256 {
    let mut inner = Keccak256::new();
    inner.update(attested.encode_fields());
    let inner = inner.finalize();

    let mut outer = Keccak256::new();
    outer.update(ETH_SIGNED_MESSAGE_PREFIX);
    outer.update(inner.as_slice());
    outer.finalize()
}

/// Computes the custody salt for one bypass window generation.
///
/// ```text
/// salt = keccak256(
///     DOMAIN_BYPASS_SALT ||
///     caller ||
///     u64_be(opened_at) ||
///     u64_be(nonce) ||
///     application ||
///     operation_key
/// )
/// ```
///
/// The nonce makes each window generation derive a distinct salt, so a
/// refreshed window gets its own custody account address.
pub fn compute_bypass_salt(
    caller: Address,
    opened_at: u64,
    nonce: u64,
    application: Address,
    operation_key: OperationKey,
) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(DOMAIN_BYPASS_SALT);
    hasher.update(caller.as_slice());
    hasher.update(u64_be(opened_at));
    hasher.update(u64_be(nonce));
    hasher.update(application.as_slice());
    hasher.update(operation_key.as_bytes());
    hasher.finalize()
}

/// Scopes a raw salt to an owner: `keccak256(DOMAIN_ACCOUNT_SALT || owner || salt)`.
///
/// Two owners supplying the same raw salt still derive distinct accounts.
pub fn compute_scoped_salt(owner: Address, salt: B256) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(DOMAIN_ACCOUNT_SALT);
    hasher.update(owner.as_slice());
    hasher.update(salt.as_slice());
    hasher.finalize()
}

/// Predicts a custody account address, CREATE2 style.
///
/// ```text
/// scoped  = keccak256(DOMAIN_ACCOUNT_SALT || owner || salt)
/// address = keccak256(0xff || factory || scoped || account_code_hash)[12..32]
/// ```
///
/// Pure function of its inputs; callable before any deployment happens.
pub fn predict_account_address(
    factory: Address,
    owner: Address,
    salt: B256,
    account_code_hash: B256,
) -> Address {
    let scoped = compute_scoped_salt(owner, salt);
    let mut hasher = Keccak256::new();
    hasher.update([0xffu8]);
    hasher.update(factory.as_slice());
    hasher.update(scoped.as_slice());
    hasher.update(account_code_hash.as_slice());
    let digest = hasher.finalize();
    Address::from_slice(&digest[12..])
}

/// Computes a delayed-deposit identifier.
///
/// ```text
/// id = keccak256(
///     DOMAIN_DEPOSIT ||
///     owner ||
///     asset ||
///     u128_be(amount) ||
///     destination ||
///     u64_be(created_at) ||
///     u64_be(sequence)
/// )
/// ```
///
/// The ledger sequence number guarantees uniqueness even when every other
/// field repeats within one second.
pub fn compute_deposit_id(
    owner: Address,
    asset: Address,
    amount: u128,
    destination: Address,
    created_at: u64,
    sequence: u64,
) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(DOMAIN_DEPOSIT);
    hasher.update(owner.as_slice());
    hasher.update(asset.as_slice());
    hasher.update(u128_be(amount));
    hasher.update(destination.as_slice());
    hasher.update(u64_be(created_at));
    hasher.update(u64_be(sequence));
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_attested() -> AttestedData {
        AttestedData {
            score: 850,
            issued_at: 1_700_000_000,
            network_id: 8453,
        }
    }

    fn sample_domain() -> VerifyingDomain {
        VerifyingDomain {
            network_id: 8453,
            verifier: Address::repeat_byte(0x42),
        }
    }

    #[test]
    fn structured_digest_is_deterministic() {
        let a = compute_structured_digest(&sample_domain(), &sample_attested());
        let b = compute_structured_digest(&sample_domain(), &sample_attested());
        assert_eq!(a, b);
    }

    #[test]
    fn structured_digest_binds_to_verifier_identity() {
        let attested = sample_attested();
        let base = compute_structured_digest(&sample_domain(), &attested);

        let other_network = VerifyingDomain {
            network_id: 1,
            ..sample_domain()
        };
        assert_ne!(base, compute_structured_digest(&other_network, &attested));

        let other_verifier = VerifyingDomain {
            verifier: Address::repeat_byte(0x43),
            ..sample_domain()
        };
        assert_ne!(base, compute_structured_digest(&other_verifier, &attested));
    }

    #[test]
    fn structured_digest_changes_with_each_field() {
        let domain = sample_domain();
        let base = compute_structured_digest(&domain, &sample_attested());

        let mut changed = sample_attested();
        changed.score += 1;
        assert_ne!(base, compute_structured_digest(&domain, &changed));

        let mut changed = sample_attested();
        changed.issued_at += 1;
        assert_ne!(base, compute_structured_digest(&domain, &changed));

        let mut changed = sample_attested();
        changed.network_id += 1;
        assert_ne!(base, compute_structured_digest(&domain, &changed));
    }

    #[test]
    fn legacy_and_structured_digests_differ() {
        let attested = sample_attested();
        assert_ne!(
            compute_legacy_digest(&attested),
            compute_structured_digest(&sample_domain(), &attested)
        );
    }

    #[test]
    fn bypass_salt_varies_per_generation() {
        let caller = Address::repeat_byte(0x01);
        let app = Address::repeat_byte(0x02);
        let key = OperationKey::from_label("transfer");

        let gen1 = compute_bypass_salt(caller, 1_000, 1, app, key);
        let gen2 = compute_bypass_salt(caller, 1_000, 2, app, key);
        let later = compute_bypass_salt(caller, 1_001, 1, app, key);
        assert_ne!(gen1, gen2);
        assert_ne!(gen1, later);
    }

    #[test]
    fn scoped_salt_separates_owners() {
        let salt = B256::repeat_byte(0x07);
        let a = compute_scoped_salt(Address::repeat_byte(0x01), salt);
        let b = compute_scoped_salt(Address::repeat_byte(0x02), salt);
        assert_ne!(a, b);
    }

    #[test]
    fn predicted_address_is_stable_and_salt_sensitive() {
        let factory = Address::repeat_byte(0xfa);
        let owner = Address::repeat_byte(0x01);
        let code_hash = B256::repeat_byte(0xcc);

        let a = predict_account_address(factory, owner, B256::ZERO, code_hash);
        let b = predict_account_address(factory, owner, B256::ZERO, code_hash);
        let c = predict_account_address(factory, owner, B256::repeat_byte(0x01), code_hash);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Address::ZERO);
    }

    #[test]
    fn deposit_ids_differ_on_sequence_alone() {
        let owner = Address::repeat_byte(0x01);
        let asset = Address::repeat_byte(0x02);
        let dest = Address::repeat_byte(0x03);

        let a = compute_deposit_id(owner, asset, 1_000, dest, 500, 1);
        let b = compute_deposit_id(owner, asset, 1_000, dest, 500, 2);
        assert_ne!(a, b);
    }
}
