//! Scorelock Library
//!
//! Score-gated compliance verification with time-locked bypass windows,
//! deterministic custody accounts, and delayed deposit settlement.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (attestations, requirements, events)
//! - [`crypto`] - Cryptographic utilities (digests, signing, validation)
//! - [`ledger`] - Bypass windows, custody directory, delayed deposits
//! - [`verifier`] - The embedding facade and its configuration

pub mod crypto;
pub mod domain;
pub mod ledger;
pub mod verifier;

// Re-export commonly used types
pub use domain::{
    AttestedData, ComplianceSubmission, DecodeError, OperationKey, VerifierEvent,
    VerifyingRequirement, MAX_SCORE,
};

pub use crypto::{
    ContractSigner, EvaluatorSigningKey, SignatureValidator, VerifyingDomain,
};

pub use ledger::{
    AccountDeployer, BypassCheck, BypassKey, BypassLedger, BypassWindow, ClaimStatus,
    CustodyAccountDirectory, CustodyVault, DelayedCustodyLedger, DelayedDeposit, DeployError,
    DeployOutcome, DepositPortfolio, HoldDecision, InMemoryVault, InProcessDeployer, Result,
    VaultError, VerifierError,
};

pub use verifier::{ComplianceVerifier, VerifierConfig};
