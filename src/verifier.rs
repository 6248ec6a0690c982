//! Compliance verifier facade.
//!
//! [`ComplianceVerifier`] is the embedding surface: applications register
//! requirements, callers submit signed attestations, and the facade wires
//! the signature validator, bypass ledger, custody directory, delayed
//! ledger, and vault together behind two entry points:
//!
//! - [`verify`](ComplianceVerifier::verify), a read-only check that never
//!   changes state, and
//! - [`verify_with_bypass`](ComplianceVerifier::verify_with_bypass), which
//!   on a failed check opens a time-locked window instead of merely denying.
//!
//! Authentication failures are errors; an authenticated submission that
//! simply does not meet the requirement is an `Ok(false)` denial. The
//! engine never reads a clock: every entry point takes the current time
//! from the embedder.

use alloy_primitives::{Address, B256};
use std::collections::HashMap;

use crate::crypto::{ContractSigner, SignatureValidator, VerifyingDomain};
use crate::domain::{
    ComplianceSubmission, OperationKey, VerifierEvent, VerifyingRequirement,
};
use crate::ledger::{
    AccountDeployer, BypassCheck, BypassKey, BypassLedger, BypassWindow, ClaimStatus,
    CustodyAccountDirectory, CustodyVault, DelayedCustodyLedger, DelayedDeposit, DepositPortfolio,
    HoldDecision, InMemoryVault, InProcessDeployer, Result, VerifierError,
    DEFAULT_LOCK_SECS_PER_POINT,
};

// ============================================================================
// Configuration
// ============================================================================

/// Deployment parameters for one verifier instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Network this deployment serves; structured digests commit to it.
    pub network_id: u64,
    /// Address this deployment is known by; structured digests commit to it.
    pub verifier_address: Address,
    /// Lock seconds per point of score shortfall.
    pub lock_secs_per_point: u64,
    /// Factory identity used in custody address derivation.
    pub account_factory: Address,
    /// Code hash used in custody address derivation.
    pub account_code_hash: B256,
    /// Entry fee of the bundled in-memory vault, in basis points.
    pub vault_fee_bps: u16,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            network_id: 1,
            verifier_address: Address::ZERO,
            lock_secs_per_point: DEFAULT_LOCK_SECS_PER_POINT,
            account_factory: Address::ZERO,
            account_code_hash: alloy_primitives::keccak256(b"scorelock.custody-account.v1"),
            vault_fee_bps: 0,
        }
    }
}

impl VerifierConfig {
    /// Loads configuration from `SCORELOCK_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            network_id: env_or("SCORELOCK_NETWORK_ID", defaults.network_id),
            verifier_address: env_or("SCORELOCK_VERIFIER_ADDRESS", defaults.verifier_address),
            lock_secs_per_point: env_or(
                "SCORELOCK_LOCK_SECS_PER_POINT",
                defaults.lock_secs_per_point,
            ),
            account_factory: env_or("SCORELOCK_ACCOUNT_FACTORY", defaults.account_factory),
            account_code_hash: env_or("SCORELOCK_ACCOUNT_CODE_HASH", defaults.account_code_hash),
            vault_fee_bps: env_or("SCORELOCK_VAULT_FEE_BPS", defaults.vault_fee_bps),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Facade
// ============================================================================

/// Score-gated compliance verifier.
pub struct ComplianceVerifier {
    config: VerifierConfig,
    owner: Address,
    trusted_signer: Address,
    validator: SignatureValidator,
    requirements: HashMap<(Address, OperationKey), VerifyingRequirement>,
    bypass: BypassLedger,
    directory: CustodyAccountDirectory,
    delayed: DelayedCustodyLedger,
    vault: Box<dyn CustodyVault>,
    events: Vec<VerifierEvent>,
}

impl ComplianceVerifier {
    /// Builds a verifier with the bundled in-process deployer and in-memory
    /// vault.
    pub fn new(owner: Address, trusted_signer: Address, config: VerifierConfig) -> Self {
        let vault = Box::new(InMemoryVault::new(config.vault_fee_bps));
        Self::with_collaborators(
            owner,
            trusted_signer,
            config,
            Box::new(InProcessDeployer::new()),
            vault,
        )
    }

    /// Builds a verifier around embedder-supplied deployment and vault
    /// implementations.
    pub fn with_collaborators(
        owner: Address,
        trusted_signer: Address,
        config: VerifierConfig,
        deployer: Box<dyn AccountDeployer>,
        vault: Box<dyn CustodyVault>,
    ) -> Self {
        tracing::info!(
            owner = %owner,
            trusted_signer = %trusted_signer,
            network_id = config.network_id,
            "Compliance verifier initialized"
        );
        let directory =
            CustodyAccountDirectory::new(config.account_factory, config.account_code_hash, deployer);
        Self {
            bypass: BypassLedger::new(config.lock_secs_per_point),
            directory,
            config,
            owner,
            trusted_signer,
            validator: SignatureValidator::new(),
            requirements: HashMap::new(),
            delayed: DelayedCustodyLedger::new(),
            vault,
            events: Vec::new(),
        }
    }

    fn domain(&self) -> VerifyingDomain {
        VerifyingDomain {
            network_id: self.config.network_id,
            verifier: self.config.verifier_address,
        }
    }

    /// Decodes and authenticates a submission for the invoked key.
    ///
    /// Failures surface in a fixed order: structural decode, key mismatch,
    /// signature. Policy is not consulted here.
    fn authenticate(&self, key: OperationKey, payload: &[u8]) -> Result<ComplianceSubmission> {
        let submission = ComplianceSubmission::decode(payload)?;
        if submission.operation_key != key {
            return Err(VerifierError::KeyMismatch {
                invoked: key,
                submitted: submission.operation_key,
            });
        }
        if !self.validator.verify(
            self.trusted_signer,
            &submission.attested,
            &submission.signature,
            &self.domain(),
        ) {
            return Err(VerifierError::UntrustedSignature {
                expected: self.trusted_signer,
            });
        }
        Ok(submission)
    }

    // ------------------------------------------------------------------
    // Requirements
    // ------------------------------------------------------------------

    /// Registers or replaces the requirement for `(application, key)`.
    /// Last write wins.
    pub fn set_requirement(
        &mut self,
        application: Address,
        key: OperationKey,
        requirement: VerifyingRequirement,
    ) {
        tracing::info!(
            application = %application,
            operation_key = %key,
            min_score = requirement.min_score,
            expires_at = requirement.expires_at,
            required_network_id = requirement.required_network_id,
            "Requirement set"
        );
        self.requirements.insert((application, key), requirement);
        self.events.push(VerifierEvent::RequirementSet {
            application,
            key,
            requirement,
        });
    }

    /// Requirement in force for `(application, key)`. Unregistered pairs
    /// behave as the all-zero requirement, which gates nothing.
    pub fn requirement_of(&self, application: Address, key: OperationKey) -> VerifyingRequirement {
        self.requirements
            .get(&(application, key))
            .copied()
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------

    /// Read-only verification. Authenticates the submission, then answers
    /// whether a matured window or a direct requirement pass grants access.
    /// Never writes any state.
    pub fn verify(
        &self,
        application: Address,
        key: OperationKey,
        payload: &[u8],
        now: u64,
    ) -> Result<bool> {
        let submission = self.authenticate(key, payload)?;
        let requirement = self.requirement_of(application, key);
        let bypass_key = BypassKey {
            caller: submission.caller,
            application,
            operation_key: key,
        };
        let check = self.bypass.check(
            &bypass_key,
            &submission.attested,
            &requirement,
            now,
            self.config.network_id,
        );
        Ok(check.is_granted())
    }

    /// Mutating verification. On a failed check this opens (or refreshes)
    /// the caller's bypass window and materializes its custody account, so
    /// a denial here is an observable state change, not just a `false`.
    pub fn verify_with_bypass(
        &mut self,
        application: Address,
        key: OperationKey,
        payload: &[u8],
        now: u64,
    ) -> Result<bool> {
        let submission = self.authenticate(key, payload)?;
        let requirement = self.requirement_of(application, key);
        let bypass_key = BypassKey {
            caller: submission.caller,
            application,
            operation_key: key,
        };
        let check = self.bypass.check_or_open(
            bypass_key,
            &submission.attested,
            &requirement,
            now,
            self.config.network_id,
            &mut self.directory,
        );
        if let BypassCheck::WindowOpened { window, custody } = &check {
            self.events.push(VerifierEvent::WindowOpened {
                caller: submission.caller,
                application,
                key,
                nonce: window.nonce,
                matures_at: window.matures_at,
                lock_secs: window.matures_at.saturating_sub(now),
            });
            if let Some(outcome) = custody {
                if outcome.created {
                    self.events.push(VerifierEvent::AccountDeployed {
                        owner: submission.caller,
                        account: outcome.account,
                    });
                }
            }
        }
        Ok(check.is_granted())
    }

    // ------------------------------------------------------------------
    // Signer administration
    // ------------------------------------------------------------------

    /// Rotates the trusted evaluator address. Owner only.
    pub fn update_trusted_signer(&mut self, sender: Address, new_signer: Address) -> Result<()> {
        if sender != self.owner {
            return Err(VerifierError::Unauthorized(
                "only the owner may rotate the trusted signer".into(),
            ));
        }
        let previous = self.trusted_signer;
        self.trusted_signer = new_signer;
        tracing::info!(previous = %previous, current = %new_signer, "Trusted signer rotated");
        self.events.push(VerifierEvent::SignerRotated {
            previous,
            current: new_signer,
        });
        Ok(())
    }

    /// Registers a contract-signer callback for an address. Owner only.
    pub fn register_contract_signer(
        &mut self,
        sender: Address,
        signer: Address,
        callback: Box<dyn ContractSigner>,
    ) -> Result<()> {
        if sender != self.owner {
            return Err(VerifierError::Unauthorized(
                "only the owner may register contract signers".into(),
            ));
        }
        self.validator.register_contract_signer(signer, callback);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Custody
    // ------------------------------------------------------------------

    /// Routes a deposit under the owner's current lock state. Pass the
    /// `matures_at` of the owner's relevant bypass window, or zero when
    /// there is none.
    pub fn request_delayed_deposit(
        &mut self,
        owner: Address,
        asset: Address,
        amount: u128,
        bypass_matures_at: u64,
        now: u64,
    ) -> Result<HoldDecision> {
        let decision = self.delayed.request_hold(
            owner,
            asset,
            amount,
            bypass_matures_at,
            now,
            &mut self.directory,
        )?;
        if let HoldDecision::Held {
            deposit_id,
            custody_account,
            matures_at,
            account_created,
        } = decision
        {
            if account_created {
                self.events.push(VerifierEvent::AccountDeployed {
                    owner,
                    account: custody_account,
                });
            }
            self.events.push(VerifierEvent::DepositHeld {
                owner,
                deposit_id,
                asset,
                amount,
                custody_account,
                matures_at,
            });
        }
        Ok(decision)
    }

    /// Relays an owner's vault approval for a custody account. This is the
    /// out-of-band precondition for [`claim`](Self::claim); nothing in the
    /// verification paths calls it.
    pub fn authorize_custody(&mut self, account: Address, asset: Address, amount: u128) {
        self.vault.authorize(account, asset, amount);
    }

    /// Read-only claim eligibility for one deposit.
    pub fn can_claim(&self, owner: Address, deposit_id: B256, now: u64) -> ClaimStatus {
        self.delayed.can_claim(owner, deposit_id, now)
    }

    /// Claims a matured deposit against the vault, returning issued shares.
    pub fn claim(&mut self, owner: Address, deposit_id: B256, now: u64) -> Result<u128> {
        let shares = self
            .delayed
            .claim(owner, deposit_id, now, self.vault.as_mut())?;
        self.events.push(VerifierEvent::DepositClaimed {
            owner,
            deposit_id,
            shares,
        });
        Ok(shares)
    }

    /// Aggregated deposit view for one owner.
    pub fn portfolio(&self, owner: Address, now: u64) -> DepositPortfolio {
        self.delayed.portfolio(owner, now)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn trusted_signer(&self) -> Address {
        self.trusted_signer
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Current bypass window for `(caller, application, key)`, if any.
    pub fn bypass_window(
        &self,
        caller: Address,
        application: Address,
        key: OperationKey,
    ) -> Option<BypassWindow> {
        self.bypass.window(&BypassKey {
            caller,
            application,
            operation_key: key,
        })
    }

    /// Primary custody account of `owner`, if materialized.
    pub fn custody_account_of(&self, owner: &Address) -> Option<Address> {
        self.directory.account_of(owner)
    }

    /// Predicted custody address for `(owner, salt)`; no deployment happens.
    pub fn predict_custody_address(&self, owner: Address, salt: B256) -> Address {
        self.directory.predict_address(owner, salt)
    }

    /// Deposit entry lookup by identifier.
    pub fn deposit(&self, deposit_id: &B256) -> Option<&DelayedDeposit> {
        self.delayed.deposit(deposit_id)
    }

    /// Events appended so far, oldest first.
    pub fn events(&self) -> &[VerifierEvent] {
        &self.events
    }

    /// Drains the event log, handing ownership to the embedder.
    pub fn take_events(&mut self) -> Vec<VerifierEvent> {
        std::mem::take(&mut self.events)
    }

    /// Vault handle, e.g. for out-of-band authorization flows.
    pub fn vault(&self) -> &dyn CustodyVault {
        self.vault.as_ref()
    }

    pub fn vault_mut(&mut self) -> &mut dyn CustodyVault {
        self.vault.as_mut()
    }
}
