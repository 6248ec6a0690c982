//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use alloy_primitives::{Address, B256};

use scorelock::{
    AttestedData, ComplianceSubmission, ComplianceVerifier, EvaluatorSigningKey, OperationKey,
    VerifierConfig, VerifyingDomain,
};

/// Network every fixture runs on unless a test overrides it.
pub const TEST_NETWORK: u64 = 8453;

/// Installs the test tracing subscriber once; later calls are no-ops.
/// Scope output with `RUST_LOG`, e.g. `RUST_LOG=scorelock=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Test verifier contract address
pub fn test_verifier_address() -> Address {
    Address::repeat_byte(0x42)
}

/// Test owner (administrator) address
pub fn test_owner() -> Address {
    Address::repeat_byte(0xad)
}

/// Test application address
pub fn test_application() -> Address {
    Address::repeat_byte(0xa1)
}

/// Test caller address
pub fn test_caller() -> Address {
    Address::repeat_byte(0xc1)
}

/// Test asset address
pub fn test_asset() -> Address {
    Address::repeat_byte(0xe7)
}

/// Deterministic non-zero salt
pub fn test_salt(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

/// Verifier configuration used across integration tests
pub fn test_config() -> VerifierConfig {
    VerifierConfig {
        network_id: TEST_NETWORK,
        verifier_address: test_verifier_address(),
        account_factory: Address::repeat_byte(0xfa),
        ..VerifierConfig::default()
    }
}

/// The signing domain matching [`test_config`]
pub fn test_domain() -> VerifyingDomain {
    VerifyingDomain {
        network_id: TEST_NETWORK,
        verifier: test_verifier_address(),
    }
}

/// A verifier wired to a fresh evaluator key
pub struct TestVerifier {
    pub verifier: ComplianceVerifier,
    pub evaluator: EvaluatorSigningKey,
}

impl TestVerifier {
    pub fn new() -> Self {
        init_tracing();
        let evaluator = EvaluatorSigningKey::generate();
        let verifier = ComplianceVerifier::new(test_owner(), evaluator.address(), test_config());
        Self {
            verifier,
            evaluator,
        }
    }

    /// Encoded submission for `test_caller`, signed with the structured digest.
    pub fn submission(&self, op_key: OperationKey, score: u16) -> Vec<u8> {
        SubmissionBuilder::new(op_key).score(score).sign(&self.evaluator)
    }
}

impl Default for TestVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for encoded compliance submissions
pub struct SubmissionBuilder {
    caller: Address,
    operation_key: OperationKey,
    score: u16,
    issued_at: u64,
    network_id: u64,
    domain: VerifyingDomain,
}

impl SubmissionBuilder {
    pub fn new(operation_key: OperationKey) -> Self {
        Self {
            caller: test_caller(),
            operation_key,
            score: 500,
            issued_at: 900,
            network_id: TEST_NETWORK,
            domain: test_domain(),
        }
    }

    pub fn caller(mut self, caller: Address) -> Self {
        self.caller = caller;
        self
    }

    pub fn score(mut self, score: u16) -> Self {
        self.score = score;
        self
    }

    pub fn issued_at(mut self, issued_at: u64) -> Self {
        self.issued_at = issued_at;
        self
    }

    pub fn network_id(mut self, network_id: u64) -> Self {
        self.network_id = network_id;
        self
    }

    pub fn domain(mut self, domain: VerifyingDomain) -> Self {
        self.domain = domain;
        self
    }

    fn attested(&self) -> AttestedData {
        AttestedData {
            score: self.score,
            issued_at: self.issued_at,
            network_id: self.network_id,
        }
    }

    /// Signs the structured digest and encodes the submission.
    pub fn sign(self, evaluator: &EvaluatorSigningKey) -> Vec<u8> {
        let attested = self.attested();
        let signature = evaluator
            .sign_structured(&self.domain, &attested)
            .expect("signing test submission");
        self.with_signature(signature)
    }

    /// Signs the legacy EIP-191 digest and encodes the submission.
    pub fn sign_legacy(self, evaluator: &EvaluatorSigningKey) -> Vec<u8> {
        let attested = self.attested();
        let signature = evaluator
            .sign_legacy(&attested)
            .expect("signing test submission");
        self.with_signature(signature)
    }

    /// Encodes with an arbitrary signature blob (contract signers, tampering).
    pub fn with_signature(self, signature: Vec<u8>) -> Vec<u8> {
        ComplianceSubmission {
            caller: self.caller,
            operation_key: self.operation_key,
            attested: self.attested(),
            signature,
        }
        .encode()
    }
}

/// Assert that a result is Ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a result is Err
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_decodable_submissions() {
        let evaluator = EvaluatorSigningKey::generate();
        let op_key = OperationKey::from_label("transfer");
        let payload = SubmissionBuilder::new(op_key).score(321).sign(&evaluator);

        let decoded = ComplianceSubmission::decode(&payload).unwrap();
        assert_eq!(decoded.caller, test_caller());
        assert_eq!(decoded.operation_key, op_key);
        assert_eq!(decoded.attested.score, 321);
    }

    #[test]
    fn fixture_verifier_accepts_its_own_submissions() {
        let fixture = TestVerifier::new();
        let op_key = OperationKey::from_label("transfer");
        let payload = fixture.submission(op_key, 700);
        let granted = fixture
            .verifier
            .verify(test_application(), op_key, &payload, 1_000)
            .unwrap();
        assert!(granted);
    }
}
