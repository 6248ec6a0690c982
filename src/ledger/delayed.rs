//! Delayed custody ledger.
//!
//! Deposits made while a bypass window is still locked do not settle
//! directly. They are intercepted: funds route to the owner's custody
//! account and a deposit entry is recorded that becomes claimable when the
//! window would have matured. Claims are exactly-once and settle against
//! the vault using the custody account's pre-authorized allowance.
//!
//! The ledger is append-only. Entries flip a `claimed` flag but are never
//! removed, so the full history stays auditable.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::crypto::compute_deposit_id;
use crate::ledger::custody::CustodyAccountDirectory;
use crate::ledger::error::{Result, VerifierError};
use crate::ledger::vault::CustodyVault;

/// One intercepted deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedDeposit {
    /// Unique identifier, derived from the entry fields and a ledger
    /// sequence number.
    pub deposit_id: B256,
    /// Who may claim.
    pub owner: Address,
    /// Asset deposited.
    pub asset: Address,
    /// Amount held.
    pub amount: u128,
    /// Custody account the funds routed to. Always the owner's account,
    /// never a caller-chosen address.
    pub destination: Address,
    /// Instant the deposit becomes claimable.
    pub matures_at: u64,
    /// Instant the hold was recorded.
    pub created_at: u64,
    /// Set once the deposit has been exchanged for shares.
    pub claimed: bool,
}

/// What happened to a deposit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldDecision {
    /// No active lock: the deposit may settle immediately, nothing recorded.
    Proceed,
    /// The deposit was intercepted and parked.
    Held {
        deposit_id: B256,
        custody_account: Address,
        matures_at: u64,
        /// Whether resolving the custody account performed a deployment.
        account_created: bool,
    },
}

impl HoldDecision {
    pub fn proceeds_immediately(&self) -> bool {
        matches!(self, HoldDecision::Proceed)
    }
}

/// Read-only claim eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    /// No such deposit for this owner.
    Unknown,
    /// Recorded but still locked.
    Pending {
        matures_at: u64,
        custody_account: Address,
        amount: u128,
    },
    /// Matured and ready to exchange.
    Claimable {
        custody_account: Address,
        amount: u128,
    },
    /// Already exchanged.
    Claimed,
}

impl ClaimStatus {
    pub fn is_claimable(&self) -> bool {
        matches!(self, ClaimStatus::Claimable { .. })
    }
}

/// Aggregated view of one owner's deposits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositPortfolio {
    /// Unmatured entries, in recording order.
    pub pending: Vec<DelayedDeposit>,
    /// Matured, unclaimed entries, in recording order.
    pub claimable: Vec<DelayedDeposit>,
    /// How many entries were already claimed.
    pub claimed_count: usize,
    /// Sum of unclaimed amounts, pending and claimable alike. Saturates
    /// at `u128::MAX`.
    pub total_locked: u128,
    /// Earliest maturity among pending entries.
    pub next_maturity: Option<u64>,
}

/// Append-only ledger of intercepted deposits.
#[derive(Debug, Default)]
pub struct DelayedCustodyLedger {
    entries: Vec<DelayedDeposit>,
    index: HashMap<B256, usize>,
    sequence: u64,
}

impl DelayedCustodyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes a deposit. With no active lock (`bypass_matures_at` zero or
    /// already past) the deposit proceeds untouched. Otherwise the owner's
    /// custody account is resolved (deploying one under the default salt if
    /// needed) and a hold entry is recorded maturing with the lock.
    ///
    /// Unlike the window-open path, a deployment failure here is an error:
    /// without a custody account there is nowhere safe to park the funds.
    pub fn request_hold(
        &mut self,
        owner: Address,
        asset: Address,
        amount: u128,
        bypass_matures_at: u64,
        now: u64,
        directory: &mut CustodyAccountDirectory,
    ) -> Result<HoldDecision> {
        if bypass_matures_at == 0 || bypass_matures_at <= now {
            return Ok(HoldDecision::Proceed);
        }

        let outcome = directory
            .resolve_account(owner)
            .map_err(|e| VerifierError::AccountDeployment(e.to_string()))?;

        self.sequence += 1;
        let deposit_id =
            compute_deposit_id(owner, asset, amount, outcome.account, now, self.sequence);
        let entry = DelayedDeposit {
            deposit_id,
            owner,
            asset,
            amount,
            destination: outcome.account,
            matures_at: bypass_matures_at,
            created_at: now,
            claimed: false,
        };
        self.index.insert(deposit_id, self.entries.len());
        self.entries.push(entry);
        tracing::info!(
            owner = %owner,
            deposit_id = %deposit_id,
            asset = %asset,
            amount,
            custody_account = %outcome.account,
            matures_at = bypass_matures_at,
            "Held delayed deposit"
        );

        Ok(HoldDecision::Held {
            deposit_id,
            custody_account: outcome.account,
            matures_at: bypass_matures_at,
            account_created: outcome.created,
        })
    }

    /// Entry lookup by identifier, regardless of owner.
    pub fn deposit(&self, deposit_id: &B256) -> Option<&DelayedDeposit> {
        self.index.get(deposit_id).map(|idx| &self.entries[*idx])
    }

    /// Read-only eligibility check. Entries belonging to other owners
    /// answer `Unknown` rather than leaking their state.
    pub fn can_claim(&self, owner: Address, deposit_id: B256, now: u64) -> ClaimStatus {
        let Some(entry) = self.deposit(&deposit_id) else {
            return ClaimStatus::Unknown;
        };
        if entry.owner != owner {
            return ClaimStatus::Unknown;
        }
        if entry.claimed {
            return ClaimStatus::Claimed;
        }
        if now < entry.matures_at {
            return ClaimStatus::Pending {
                matures_at: entry.matures_at,
                custody_account: entry.destination,
                amount: entry.amount,
            };
        }
        ClaimStatus::Claimable {
            custody_account: entry.destination,
            amount: entry.amount,
        }
    }

    /// Claims a matured deposit: consumes the custody account's vault
    /// allowance and issues shares, returning the share count.
    ///
    /// The claimed flag flips only after the vault exchange succeeds, so a
    /// failed claim can simply be retried.
    pub fn claim(
        &mut self,
        owner: Address,
        deposit_id: B256,
        now: u64,
        vault: &mut dyn CustodyVault,
    ) -> Result<u128> {
        let idx = match self.index.get(&deposit_id) {
            Some(idx) if self.entries[*idx].owner == owner => *idx,
            _ => return Err(VerifierError::DepositNotFound(deposit_id)),
        };
        let entry = &self.entries[idx];
        if entry.claimed {
            return Err(VerifierError::ClaimAlreadyDone(deposit_id));
        }
        if now < entry.matures_at {
            return Err(VerifierError::ClaimNotYetEligible {
                matures_at: entry.matures_at,
                now,
            });
        }

        let authorized = vault.authorized_amount(entry.destination, entry.asset);
        if authorized < entry.amount {
            return Err(VerifierError::InsufficientAuthorization {
                account: entry.destination,
                authorized,
                required: entry.amount,
            });
        }

        let shares = vault
            .exchange(entry.destination, entry.asset, entry.amount)
            .map_err(|e| VerifierError::Vault(e.to_string()))?;
        self.entries[idx].claimed = true;
        tracing::info!(
            owner = %owner,
            deposit_id = %deposit_id,
            shares,
            "Claimed delayed deposit"
        );
        Ok(shares)
    }

    /// Aggregates one owner's entries at `now`.
    pub fn portfolio(&self, owner: Address, now: u64) -> DepositPortfolio {
        let mut portfolio = DepositPortfolio::default();
        for entry in self.entries.iter().filter(|e| e.owner == owner) {
            if entry.claimed {
                portfolio.claimed_count += 1;
                continue;
            }
            portfolio.total_locked = portfolio.total_locked.saturating_add(entry.amount);
            if now >= entry.matures_at {
                portfolio.claimable.push(entry.clone());
            } else {
                portfolio.next_maturity = Some(
                    portfolio
                        .next_maturity
                        .map_or(entry.matures_at, |m| m.min(entry.matures_at)),
                );
                portfolio.pending.push(entry.clone());
            }
        }
        portfolio
    }

    /// Total entries ever recorded.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
