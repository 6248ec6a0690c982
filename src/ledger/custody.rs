//! Custody account directory.
//!
//! Custody accounts are deterministic per-owner vault accounts. Their
//! addresses derive from `(factory, owner, salt, account code hash)` alone,
//! CREATE2 style, so any party can predict an address before it exists.
//! The directory tracks which addresses have been materialized and owns the
//! only deployment path, keeping `deploy_if_absent` idempotent per
//! `(owner, salt)` pair.
//!
//! Each owner also has one primary account, fixed by whichever flow
//! materializes an account for them first. Deposit interception always
//! routes funds there, never to a caller-chosen destination.

use alloy_primitives::{Address, B256};
use std::collections::HashMap;
use std::fmt;

use crate::crypto::predict_account_address;

/// Salt used when an owner needs an account but no flow supplied one.
pub const DEFAULT_ACCOUNT_SALT: B256 = B256::ZERO;

/// Errors surfaced by account deployers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeployError {
    /// The predicted address already hosts an account. The directory treats
    /// this as success and adopts the address.
    #[error("address already in use: {0}")]
    AddressInUse(Address),
    /// Deployment failed outright.
    #[error("deployment failed: {0}")]
    Failed(String),
}

/// Materializes custody accounts at predicted addresses.
///
/// The in-process implementation just records addresses; embedders provide
/// one that drives a real factory.
pub trait AccountDeployer: Send + Sync {
    fn deploy(&mut self, owner: Address, account: Address) -> Result<(), DeployError>;
}

/// Deployer that tracks materialized addresses in memory.
#[derive(Debug, Default)]
pub struct InProcessDeployer {
    deployed: HashMap<Address, Address>,
}

impl InProcessDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_deployed(&self, account: &Address) -> bool {
        self.deployed.contains_key(account)
    }

    pub fn deployment_count(&self) -> usize {
        self.deployed.len()
    }
}

impl AccountDeployer for InProcessDeployer {
    fn deploy(&mut self, owner: Address, account: Address) -> Result<(), DeployError> {
        if self.deployed.contains_key(&account) {
            return Err(DeployError::AddressInUse(account));
        }
        self.deployed.insert(account, owner);
        Ok(())
    }
}

/// Result of a directory materialization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOutcome {
    /// The custody account address.
    pub account: Address,
    /// Whether this call performed the underlying deployment. `false` when
    /// the record already existed or an in-use address was adopted.
    pub created: bool,
}

/// Registry of materialized custody accounts plus the deployment path.
pub struct CustodyAccountDirectory {
    factory: Address,
    account_code_hash: B256,
    deployer: Box<dyn AccountDeployer>,
    /// Materialized accounts by (owner, raw salt).
    records: HashMap<(Address, B256), Address>,
    /// First materialized account per owner; immutable once set.
    primary: HashMap<Address, Address>,
}

impl CustodyAccountDirectory {
    pub fn new(
        factory: Address,
        account_code_hash: B256,
        deployer: Box<dyn AccountDeployer>,
    ) -> Self {
        Self {
            factory,
            account_code_hash,
            deployer,
            records: HashMap::new(),
            primary: HashMap::new(),
        }
    }

    /// Predicts the account address for `(owner, salt)` without deploying.
    pub fn predict_address(&self, owner: Address, salt: B256) -> Address {
        predict_account_address(self.factory, owner, salt, self.account_code_hash)
    }

    /// Primary custody account of `owner`, if one has been materialized.
    pub fn account_of(&self, owner: &Address) -> Option<Address> {
        self.primary.get(owner).copied()
    }

    /// Account recorded for an exact `(owner, salt)` pair, if any.
    pub fn account_for_salt(&self, owner: &Address, salt: &B256) -> Option<Address> {
        self.records.get(&(*owner, *salt)).copied()
    }

    /// Materializes the account for `(owner, salt)`, or returns the existing
    /// record. Repeat calls never touch the deployer again.
    ///
    /// An `AddressInUse` answer from the deployer means someone already
    /// deployed at the predicted address; the directory adopts it as its own
    /// record. Any other deployer failure propagates and leaves no record.
    pub fn deploy_if_absent(
        &mut self,
        owner: Address,
        salt: B256,
    ) -> Result<DeployOutcome, DeployError> {
        if let Some(account) = self.records.get(&(owner, salt)) {
            return Ok(DeployOutcome {
                account: *account,
                created: false,
            });
        }

        let account = self.predict_address(owner, salt);
        let created = match self.deployer.deploy(owner, account) {
            Ok(()) => {
                tracing::info!(owner = %owner, account = %account, "Deployed custody account");
                true
            }
            Err(DeployError::AddressInUse(_)) => {
                tracing::debug!(owner = %owner, account = %account, "Adopted existing custody account");
                false
            }
            Err(err) => return Err(err),
        };

        self.records.insert((owner, salt), account);
        self.primary.entry(owner).or_insert(account);
        Ok(DeployOutcome { account, created })
    }

    /// Resolves the owner's primary account, materializing one under the
    /// default salt when none exists yet.
    pub fn resolve_account(&mut self, owner: Address) -> Result<DeployOutcome, DeployError> {
        if let Some(account) = self.primary.get(&owner).copied() {
            return Ok(DeployOutcome {
                account,
                created: false,
            });
        }
        self.deploy_if_absent(owner, DEFAULT_ACCOUNT_SALT)
    }
}

impl fmt::Debug for CustodyAccountDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustodyAccountDirectory")
            .field("factory", &self.factory)
            .field("records", &self.records.len())
            .field("owners", &self.primary.len())
            .finish_non_exhaustive()
    }
}
