//! Custody vault seam.
//!
//! Claims settle against a vault: the matured amount is pulled from the
//! custody account's pre-authorized balance and exchanged for shares. The
//! verifier never authorizes on an owner's behalf; owners grant allowances
//! out-of-band and claims consume them.

use alloy_primitives::Address;
use std::collections::HashMap;

/// Errors surfaced by vault implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("exchange not authorized on {account}: authorized {authorized}, requested {requested}")]
    NotAuthorized {
        account: Address,
        authorized: u128,
        requested: u128,
    },
    #[error("exchange rejected: {0}")]
    Rejected(String),
}

/// Share-issuing vault that custody accounts settle into.
pub trait CustodyVault: Send + Sync {
    /// Sets the allowance `account` grants for `asset`, replacing any prior
    /// value. Embedders call this when relaying an owner's approval; the
    /// verification and claim paths never do.
    fn authorize(&mut self, account: Address, asset: Address, amount: u128);

    /// Remaining allowance `account` has granted for `asset`.
    fn authorized_amount(&self, account: Address, asset: Address) -> u128;

    /// Consumes `amount` of allowance and issues shares, returning the
    /// share count.
    fn exchange(&mut self, account: Address, asset: Address, amount: u128)
        -> Result<u128, VaultError>;
}

/// Basis-point denominator for vault fees.
pub const FEE_DENOMINATOR: u128 = 10_000;

/// In-memory vault with a flat entry fee in basis points.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    fee_bps: u16,
    /// Allowance per (account, asset). Set, not accumulated.
    authorizations: HashMap<(Address, Address), u128>,
    /// Issued shares per (account, asset).
    shares: HashMap<(Address, Address), u128>,
    /// Collected fees per asset.
    fees: HashMap<Address, u128>,
}

impl InMemoryVault {
    /// Creates a vault charging `fee_bps` on every exchange. Fees are capped
    /// at 100% (10_000 basis points).
    pub fn new(fee_bps: u16) -> Self {
        Self {
            fee_bps: fee_bps.min(FEE_DENOMINATOR as u16),
            ..Self::default()
        }
    }

    /// Shares issued to `(account, asset)` so far.
    pub fn shares_of(&self, account: Address, asset: Address) -> u128 {
        self.shares.get(&(account, asset)).copied().unwrap_or(0)
    }

    /// Fees collected for `asset` so far.
    pub fn collected_fees(&self, asset: Address) -> u128 {
        self.fees.get(&asset).copied().unwrap_or(0)
    }

    /// Shares an exchange of `amount` would issue after the fee.
    pub fn preview_exchange(&self, amount: u128) -> u128 {
        amount - self.fee_of(amount)
    }

    /// Fee charged on `amount`: `floor(amount * fee_bps / 10_000)`.
    fn fee_of(&self, amount: u128) -> u128 {
        let bps = u128::from(self.fee_bps);
        // Split so neither product can overflow: bps never exceeds the
        // denominator, which also keeps the fee at or below the amount.
        amount / FEE_DENOMINATOR * bps + amount % FEE_DENOMINATOR * bps / FEE_DENOMINATOR
    }
}

impl CustodyVault for InMemoryVault {
    fn authorize(&mut self, account: Address, asset: Address, amount: u128) {
        tracing::debug!(account = %account, asset = %asset, amount, "Vault authorization set");
        self.authorizations.insert((account, asset), amount);
    }

    fn authorized_amount(&self, account: Address, asset: Address) -> u128 {
        self.authorizations
            .get(&(account, asset))
            .copied()
            .unwrap_or(0)
    }

    fn exchange(
        &mut self,
        account: Address,
        asset: Address,
        amount: u128,
    ) -> Result<u128, VaultError> {
        let authorized = self.authorized_amount(account, asset);
        if authorized < amount {
            return Err(VaultError::NotAuthorized {
                account,
                authorized,
                requested: amount,
            });
        }
        self.authorizations
            .insert((account, asset), authorized - amount);

        let fee = self.fee_of(amount);
        let issued = amount - fee;
        // Running tallies saturate at the top of the range.
        let total = self.shares.entry((account, asset)).or_insert(0);
        *total = total.saturating_add(issued);
        let collected = self.fees.entry(asset).or_insert(0);
        *collected = collected.saturating_add(fee);
        tracing::debug!(account = %account, asset = %asset, amount, issued, fee, "Vault exchange");
        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: Address = Address::repeat_byte(0x0a);
    const ASSET: Address = Address::repeat_byte(0x0b);

    #[test]
    fn exchange_consumes_allowance_and_issues_shares() {
        let mut vault = InMemoryVault::new(0);
        vault.authorize(ACCOUNT, ASSET, 1_000);
        let issued = vault.exchange(ACCOUNT, ASSET, 600).unwrap();
        assert_eq!(issued, 600);
        assert_eq!(vault.authorized_amount(ACCOUNT, ASSET), 400);
        assert_eq!(vault.shares_of(ACCOUNT, ASSET), 600);
    }

    #[test]
    fn exchange_rejects_over_allowance() {
        let mut vault = InMemoryVault::new(0);
        vault.authorize(ACCOUNT, ASSET, 100);
        let err = vault.exchange(ACCOUNT, ASSET, 101).unwrap_err();
        assert_eq!(
            err,
            VaultError::NotAuthorized {
                account: ACCOUNT,
                authorized: 100,
                requested: 101,
            }
        );
        // Failed exchange leaves the allowance untouched.
        assert_eq!(vault.authorized_amount(ACCOUNT, ASSET), 100);
        assert_eq!(vault.shares_of(ACCOUNT, ASSET), 0);
    }

    #[test]
    fn fee_is_deducted_in_basis_points() {
        let mut vault = InMemoryVault::new(25);
        vault.authorize(ACCOUNT, ASSET, 10_000);
        let issued = vault.exchange(ACCOUNT, ASSET, 10_000).unwrap();
        assert_eq!(issued, 9_975);
        assert_eq!(vault.shares_of(ACCOUNT, ASSET), 9_975);
        assert_eq!(vault.collected_fees(ASSET), 25);
    }

    #[test]
    fn fee_rounds_down_on_small_amounts() {
        let mut vault = InMemoryVault::new(25);
        vault.authorize(ACCOUNT, ASSET, 100);
        // 25 bps of 100 is 0.25, which truncates to zero fee.
        let issued = vault.exchange(ACCOUNT, ASSET, 100).unwrap();
        assert_eq!(issued, 100);
        assert_eq!(vault.collected_fees(ASSET), 0);
    }

    #[test]
    fn fee_is_exact_near_the_top_of_the_range() {
        let mut vault = InMemoryVault::new(25);
        let amount = u128::MAX / 10;
        vault.authorize(ACCOUNT, ASSET, amount);
        let issued = vault.exchange(ACCOUNT, ASSET, amount).unwrap();
        // 25 bps is exactly 1/400.
        assert_eq!(vault.collected_fees(ASSET), amount / 400);
        assert_eq!(issued, amount - amount / 400);
        assert_eq!(vault.shares_of(ACCOUNT, ASSET), issued);
    }

    #[test]
    fn full_fee_consumes_the_entire_amount() {
        let mut vault = InMemoryVault::new(10_000);
        vault.authorize(ACCOUNT, ASSET, u128::MAX);
        let issued = vault.exchange(ACCOUNT, ASSET, u128::MAX).unwrap();
        assert_eq!(issued, 0);
        assert_eq!(vault.collected_fees(ASSET), u128::MAX);
    }

    #[test]
    fn share_tallies_saturate_instead_of_overflowing() {
        let mut vault = InMemoryVault::new(0);
        vault.authorize(ACCOUNT, ASSET, u128::MAX);
        vault.exchange(ACCOUNT, ASSET, u128::MAX).unwrap();
        vault.authorize(ACCOUNT, ASSET, u128::MAX);
        vault.exchange(ACCOUNT, ASSET, u128::MAX).unwrap();
        assert_eq!(vault.shares_of(ACCOUNT, ASSET), u128::MAX);
    }

    #[test]
    fn preview_matches_exchange() {
        let mut vault = InMemoryVault::new(250);
        vault.authorize(ACCOUNT, ASSET, 4_000);
        let preview = vault.preview_exchange(4_000);
        let issued = vault.exchange(ACCOUNT, ASSET, 4_000).unwrap();
        assert_eq!(preview, issued);
    }

    #[test]
    fn allowances_are_scoped_per_account_and_asset() {
        let mut vault = InMemoryVault::new(0);
        vault.authorize(ACCOUNT, ASSET, 500);
        assert_eq!(
            vault.authorized_amount(Address::repeat_byte(0x0c), ASSET),
            0
        );
        assert_eq!(
            vault.authorized_amount(ACCOUNT, Address::repeat_byte(0x0d)),
            0
        );
    }

    #[test]
    fn authorize_replaces_rather_than_accumulates() {
        let mut vault = InMemoryVault::new(0);
        vault.authorize(ACCOUNT, ASSET, 500);
        vault.authorize(ACCOUNT, ASSET, 200);
        assert_eq!(vault.authorized_amount(ACCOUNT, ASSET), 200);
    }
}
