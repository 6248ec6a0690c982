//! Attestation signature validation.
//!
//! Validation is address-centric: the verifier knows which address it
//! trusts, and this module answers whether a submitted signature binds that
//! address to the attested data. Externally-owned signers go through ECDSA
//! public-key recovery; contract signers (multisig custodians and the like)
//! go through a registered callback, mirroring ERC-1271.
//!
//! Both paths try the structured digest first and fall back to the legacy
//! EIP-191 digest, so evaluators migrating between digest schemes keep
//! verifying. Every malformed input degrades to a `false` answer.

use alloy_primitives::{Address, B256};
use std::collections::HashMap;
use std::fmt;

use crate::crypto::digest::{compute_legacy_digest, compute_structured_digest, VerifyingDomain};
use crate::crypto::signer::recover_address;
use crate::domain::AttestedData;

/// Callback for signers that are contracts rather than key holders.
///
/// Implementations answer whether `signature` is valid for `digest` under
/// the contract's own policy. They must not panic on arbitrary input.
pub trait ContractSigner: Send + Sync {
    fn is_valid_signature(&self, digest: B256, signature: &[u8]) -> bool;
}

/// Dispatches signature checks to ECDSA recovery or contract callbacks.
#[derive(Default)]
pub struct SignatureValidator {
    contract_signers: HashMap<Address, Box<dyn ContractSigner>>,
}

impl SignatureValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the validation callback for a contract signer.
    pub fn register_contract_signer(&mut self, signer: Address, callback: Box<dyn ContractSigner>) {
        tracing::info!(signer = %signer, "Registered contract signer");
        self.contract_signers.insert(signer, callback);
    }

    /// True when a callback is registered for `signer`.
    pub fn is_contract_signer(&self, signer: &Address) -> bool {
        self.contract_signers.contains_key(signer)
    }

    /// Checks that `signature` binds `signer` to `attested`.
    ///
    /// The structured digest for `domain` is tried first, then the legacy
    /// digest. Registered contract signers are consulted by callback and
    /// never fall through to key recovery.
    pub fn verify(
        &self,
        signer: Address,
        attested: &AttestedData,
        signature: &[u8],
        domain: &VerifyingDomain,
    ) -> bool {
        let structured = compute_structured_digest(domain, attested);

        if let Some(callback) = self.contract_signers.get(&signer) {
            return callback.is_valid_signature(structured, signature)
                || callback.is_valid_signature(compute_legacy_digest(attested), signature);
        }

        if recover_address(&structured, signature) == Some(signer) {
            return true;
        }
        recover_address(&compute_legacy_digest(attested), signature) == Some(signer)
    }
}

impl fmt::Debug for SignatureValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureValidator")
            .field("contract_signers", &self.contract_signers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signer::EvaluatorSigningKey;

    fn domain() -> VerifyingDomain {
        VerifyingDomain {
            network_id: 8453,
            verifier: Address::repeat_byte(0x42),
        }
    }

    fn attested() -> AttestedData {
        AttestedData {
            score: 800,
            issued_at: 1_700_000_000,
            network_id: 8453,
        }
    }

    /// Accepts one fixed opaque blob for any digest, like a threshold wallet
    /// that pre-approved the attestation.
    struct BlobApprover(&'static [u8]);

    impl ContractSigner for BlobApprover {
        fn is_valid_signature(&self, _digest: B256, signature: &[u8]) -> bool {
            signature == self.0
        }
    }

    /// Approves only a specific structured digest.
    struct DigestApprover(B256);

    impl ContractSigner for DigestApprover {
        fn is_valid_signature(&self, digest: B256, _signature: &[u8]) -> bool {
            digest == self.0
        }
    }

    #[test]
    fn accepts_structured_signature() {
        let key = EvaluatorSigningKey::generate();
        let validator = SignatureValidator::new();
        let signature = key.sign_structured(&domain(), &attested()).unwrap();
        assert!(validator.verify(key.address(), &attested(), &signature, &domain()));
    }

    #[test]
    fn accepts_legacy_signature_as_fallback() {
        let key = EvaluatorSigningKey::generate();
        let validator = SignatureValidator::new();
        let signature = key.sign_legacy(&attested()).unwrap();
        assert!(validator.verify(key.address(), &attested(), &signature, &domain()));
    }

    #[test]
    fn rejects_signature_from_other_key() {
        let key = EvaluatorSigningKey::generate();
        let other = EvaluatorSigningKey::generate();
        let validator = SignatureValidator::new();
        let signature = other.sign_structured(&domain(), &attested()).unwrap();
        assert!(!validator.verify(key.address(), &attested(), &signature, &domain()));
    }

    #[test]
    fn rejects_tampered_attested_data() {
        let key = EvaluatorSigningKey::generate();
        let validator = SignatureValidator::new();
        let signature = key.sign_structured(&domain(), &attested()).unwrap();
        let mut tampered = attested();
        tampered.score = 999;
        assert!(!validator.verify(key.address(), &tampered, &signature, &domain()));
    }

    #[test]
    fn rejects_signature_for_other_deployment() {
        let key = EvaluatorSigningKey::generate();
        let validator = SignatureValidator::new();
        let other_domain = VerifyingDomain {
            network_id: 1,
            ..domain()
        };
        let signature = key.sign_structured(&other_domain, &attested()).unwrap();
        assert!(!validator.verify(key.address(), &attested(), &signature, &domain()));
    }

    #[test]
    fn rejects_malformed_signatures() {
        let key = EvaluatorSigningKey::generate();
        let validator = SignatureValidator::new();
        assert!(!validator.verify(key.address(), &attested(), &[], &domain()));
        assert!(!validator.verify(key.address(), &attested(), &[0u8; 65], &domain()));
        assert!(!validator.verify(key.address(), &attested(), &[0xff; 130], &domain()));
    }

    #[test]
    fn contract_signer_accepts_registered_blob() {
        let signer = Address::repeat_byte(0xc0);
        let mut validator = SignatureValidator::new();
        validator.register_contract_signer(signer, Box::new(BlobApprover(b"approved")));
        assert!(validator.is_contract_signer(&signer));
        assert!(validator.verify(signer, &attested(), b"approved", &domain()));
        assert!(!validator.verify(signer, &attested(), b"denied", &domain()));
    }

    #[test]
    fn contract_signer_sees_structured_digest() {
        let signer = Address::repeat_byte(0xc1);
        let structured = compute_structured_digest(&domain(), &attested());
        let mut validator = SignatureValidator::new();
        validator.register_contract_signer(signer, Box::new(DigestApprover(structured)));
        assert!(validator.verify(signer, &attested(), b"", &domain()));

        let mut other = attested();
        other.issued_at += 1;
        assert!(!validator.verify(signer, &other, b"", &domain()));
    }

    #[test]
    fn contract_signer_never_falls_through_to_recovery() {
        // A valid ECDSA signature from a key at the registered address must
        // not pass once the address is declared contract-held.
        let key = EvaluatorSigningKey::generate();
        let signature = key.sign_structured(&domain(), &attested()).unwrap();
        let mut validator = SignatureValidator::new();
        validator.register_contract_signer(key.address(), Box::new(BlobApprover(b"only-this")));
        assert!(!validator.verify(key.address(), &attested(), &signature, &domain()));
    }
}
