//! Error types for verifier and ledger operations

use alloy_primitives::{Address, B256};
use thiserror::Error;

use crate::domain::{DecodeError, OperationKey};

/// Errors that can occur across the verification and custody paths
#[derive(Error, Debug)]
pub enum VerifierError {
    /// Submission failed structural decoding
    #[error("malformed submission: {0}")]
    Decode(#[from] DecodeError),

    /// Submission targets a different operation than the one invoked
    #[error("operation key mismatch: invoked {invoked}, submitted {submitted}")]
    KeyMismatch {
        invoked: OperationKey,
        submitted: OperationKey,
    },

    /// Signature does not bind the trusted signer to the attested data
    #[error("signature does not recover trusted signer {expected}")]
    UntrustedSignature { expected: Address },

    /// Caller is not allowed to perform an administrative operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Custody account deployment failed
    #[error("account deployment failed: {0}")]
    AccountDeployment(String),

    /// No deposit recorded under this identifier for the claimant
    #[error("deposit not found: {0}")]
    DepositNotFound(B256),

    /// Deposit was already claimed
    #[error("deposit already claimed: {0}")]
    ClaimAlreadyDone(B256),

    /// Deposit has not reached its maturity instant
    #[error("deposit not claimable until {matures_at} (now {now})")]
    ClaimNotYetEligible { matures_at: u64, now: u64 },

    /// Custody account lacks vault authorization for the deposit amount
    #[error("insufficient authorization on {account}: authorized {authorized}, required {required}")]
    InsufficientAuthorization {
        account: Address,
        authorized: u128,
        required: u128,
    },

    /// Vault rejected the exchange
    #[error("vault error: {0}")]
    Vault(String),
}

/// Result type for verifier operations
pub type Result<T> = std::result::Result<T, VerifierError>;
