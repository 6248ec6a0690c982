//! Bypass ledger: time-locked access windows.
//!
//! When a caller's attested score falls short of a requirement, the mutating
//! verification path does not simply deny. It opens a window keyed by
//! `(caller, application, operation key)` whose lock time is proportional to
//! the score shortfall. Once the window matures, checks for that key pass
//! permanently, regardless of the score submitted later.
//!
//! Windows carry a generation nonce. Opening the first window for a key
//! records nonce 1; a refresh replaces the window and increments the nonce,
//! so state tied to an older generation (custody salts in particular) can
//! never be confused with the current one. A pending window is refreshed
//! only by a submission that would mature strictly earlier; identical or
//! worse submissions leave it untouched.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::crypto::compute_bypass_salt;
use crate::domain::{AttestedData, OperationKey, VerifyingRequirement};
use crate::ledger::custody::{CustodyAccountDirectory, DeployOutcome};

/// Lock seconds added per point of score shortfall.
pub const DEFAULT_LOCK_SECS_PER_POINT: u64 = 10;

/// Scope of one bypass window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BypassKey {
    pub caller: Address,
    pub application: Address,
    pub operation_key: OperationKey,
}

/// One window generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassWindow {
    /// Instant the window unlocks, Unix seconds.
    pub matures_at: u64,
    /// Generation counter; 1 for the first window of a key.
    pub nonce: u64,
    /// Always true for windows this ledger opens; no API here clears it.
    /// [`is_matured`](Self::is_matured) honors a cleared flag on windows
    /// embedders persist elsewhere.
    pub active: bool,
}

impl BypassWindow {
    /// Maturity is inclusive: a window with `matures_at == now` has matured.
    pub fn is_matured(&self, now: u64) -> bool {
        self.active && now >= self.matures_at
    }
}

/// Outcome of a bypass evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassCheck {
    /// Granted: an active window for this key has matured.
    MaturedWindow { nonce: u64 },
    /// Granted: the requirement is met directly; no ledger state involved.
    RequirementMet,
    /// Denied without opening a window: either the read-only path, or a
    /// pending window that the submission does not improve on.
    Denied,
    /// Denied, but a window was opened or refreshed. `custody` is `None`
    /// when the companion account deployment failed; the window stands
    /// regardless.
    WindowOpened {
        window: BypassWindow,
        custody: Option<DeployOutcome>,
    },
}

impl BypassCheck {
    /// Whether the operation may proceed.
    pub fn is_granted(&self) -> bool {
        matches!(
            self,
            BypassCheck::MaturedWindow { .. } | BypassCheck::RequirementMet
        )
    }
}

/// Ledger of bypass windows across all callers and applications.
#[derive(Debug)]
pub struct BypassLedger {
    lock_secs_per_point: u64,
    windows: HashMap<BypassKey, BypassWindow>,
}

impl Default for BypassLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_SECS_PER_POINT)
    }
}

impl BypassLedger {
    pub fn new(lock_secs_per_point: u64) -> Self {
        Self {
            lock_secs_per_point,
            windows: HashMap::new(),
        }
    }

    /// Current window for a key, if any.
    pub fn window(&self, key: &BypassKey) -> Option<BypassWindow> {
        self.windows.get(key).copied()
    }

    /// Number of keys with recorded windows.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Lock duration for a submission: shortfall points times the per-point
    /// rate. Zero when the score is only blocked by network or expiry.
    pub fn lock_secs(&self, requirement: &VerifyingRequirement, attested: &AttestedData) -> u64 {
        u64::from(requirement.score_gap(attested)) * self.lock_secs_per_point
    }

    /// Read-only evaluation. Never writes, deploys, or logs.
    ///
    /// Grant order: a matured window wins first, then a direct requirement
    /// pass. Everything else is a denial.
    pub fn check(
        &self,
        key: &BypassKey,
        attested: &AttestedData,
        requirement: &VerifyingRequirement,
        now: u64,
        network_id: u64,
    ) -> BypassCheck {
        if let Some(window) = self.windows.get(key) {
            if window.is_matured(now) {
                return BypassCheck::MaturedWindow {
                    nonce: window.nonce,
                };
            }
        }
        if requirement.is_met_by(attested, now, network_id) {
            return BypassCheck::RequirementMet;
        }
        BypassCheck::Denied
    }

    /// Mutating evaluation: on a failed check, open or refresh the window
    /// for `key` and materialize a custody account tied to this generation.
    ///
    /// A pending window is replaced only when the new submission would
    /// mature strictly earlier; the replacement increments the nonce. The
    /// custody deployment is best-effort: a deployer failure is absorbed and
    /// the window write stands.
    pub fn check_or_open(
        &mut self,
        key: BypassKey,
        attested: &AttestedData,
        requirement: &VerifyingRequirement,
        now: u64,
        network_id: u64,
        directory: &mut CustodyAccountDirectory,
    ) -> BypassCheck {
        match self.check(&key, attested, requirement, now, network_id) {
            BypassCheck::Denied => {}
            granted => return granted,
        }

        let lock_secs = self.lock_secs(requirement, attested);
        let matures_at = now.saturating_add(lock_secs);

        let nonce = match self.windows.get(&key) {
            Some(existing) => {
                if matures_at >= existing.matures_at {
                    return BypassCheck::Denied;
                }
                existing.nonce + 1
            }
            None => 1,
        };

        let window = BypassWindow {
            matures_at,
            nonce,
            active: true,
        };
        self.windows.insert(key, window);
        tracing::info!(
            caller = %key.caller,
            application = %key.application,
            operation_key = %key.operation_key,
            nonce,
            lock_secs,
            matures_at,
            "Opened bypass window"
        );

        let salt = compute_bypass_salt(key.caller, now, nonce, key.application, key.operation_key);
        let custody = match directory.deploy_if_absent(key.caller, salt) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::warn!(
                    caller = %key.caller,
                    error = %err,
                    "Custody account deployment failed while opening bypass window"
                );
                None
            }
        };

        BypassCheck::WindowOpened { window, custody }
    }
}
