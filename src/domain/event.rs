//! Verifier event records.
//!
//! Every state-changing operation appends one or more events to the
//! verifier's in-memory log. Embedders drain the log for notification
//! delivery or persistence; the engine itself only appends.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use super::{OperationKey, VerifyingRequirement};

/// Record of one observable state change.
///
/// Events are appended in the order the changes were applied, so replaying
/// the log reproduces the sequence of decisions the verifier made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerifierEvent {
    /// An application registered or replaced a gating requirement.
    RequirementSet {
        application: Address,
        key: OperationKey,
        requirement: VerifyingRequirement,
    },
    /// A time-locked bypass window was opened or refreshed.
    WindowOpened {
        caller: Address,
        application: Address,
        key: OperationKey,
        nonce: u64,
        matures_at: u64,
        lock_secs: u64,
    },
    /// A custody account was materialized on-directory.
    AccountDeployed { owner: Address, account: Address },
    /// A deposit was intercepted and parked pending bypass maturity.
    DepositHeld {
        owner: Address,
        deposit_id: B256,
        asset: Address,
        amount: u128,
        custody_account: Address,
        matures_at: u64,
    },
    /// A matured deposit was exchanged for vault shares.
    DepositClaimed {
        owner: Address,
        deposit_id: B256,
        shares: u128,
    },
    /// The trusted evaluator key was rotated.
    SignerRotated { previous: Address, current: Address },
}

impl VerifierEvent {
    /// Short kind label, useful for filtering and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifierEvent::RequirementSet { .. } => "requirement_set",
            VerifierEvent::WindowOpened { .. } => "window_opened",
            VerifierEvent::AccountDeployed { .. } => "account_deployed",
            VerifierEvent::DepositHeld { .. } => "deposit_held",
            VerifierEvent::DepositClaimed { .. } => "deposit_claimed",
            VerifierEvent::SignerRotated { .. } => "signer_rotated",
        }
    }
}
