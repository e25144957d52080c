//! Value-transfer substrate seam
//!
//! The engine never moves value itself; it drives a [`ValueTransfer`]
//! implementation that must guarantee "debit sender, credit receiver" as
//! one atomic unit. [`InMemoryLedger`] is the in-process implementation
//! used by tests and single-node deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors surfaced by a value-transfer substrate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("account {account} holds {available} sats, {required} required")]
    InsufficientFunds {
        account: String,
        available: u64,
        required: u64,
    },

    #[error("transfer amount must be greater than zero")]
    ZeroAmount,

    #[error("credit to {0} would overflow its balance")]
    BalanceOverflow(String),

    #[error("transfer rejected by substrate: {0}")]
    Rejected(String),
}

/// One credit leg of a disbursement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    pub to: String,
    pub amount_sats: u64,
}

/// Atomic value movement between accounts
///
/// Implementations must apply each call completely or not at all; a
/// returned error means no balance changed.
#[async_trait]
pub trait ValueTransfer: Send + Sync {
    /// Move `amount_sats` from `from` into the escrow account
    async fn collect(
        &self,
        from: &str,
        escrow_account: &str,
        amount_sats: u64,
    ) -> Result<(), TransferError>;

    /// Drain the escrow account into the given payouts, all or none
    async fn disburse(
        &self,
        escrow_account: &str,
        payouts: &[Payout],
    ) -> Result<(), TransferError>;
}

/// In-memory account ledger with checked balances
pub struct InMemoryLedger {
    accounts: Mutex<HashMap<String, u64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// Seed an account balance, e.g. a client wallet in tests
    pub async fn credit(&self, account: &str, amount_sats: u64) -> Result<(), TransferError> {
        let mut accounts = self.accounts.lock().await;
        let balance = accounts.entry(account.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount_sats)
            .ok_or_else(|| TransferError::BalanceOverflow(account.to_string()))?;
        Ok(())
    }

    /// Current balance of an account; unknown accounts hold zero
    pub async fn balance_of(&self, account: &str) -> u64 {
        self.accounts
            .lock()
            .await
            .get(account)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValueTransfer for InMemoryLedger {
    async fn collect(
        &self,
        from: &str,
        escrow_account: &str,
        amount_sats: u64,
    ) -> Result<(), TransferError> {
        if amount_sats == 0 {
            return Err(TransferError::ZeroAmount);
        }

        let mut accounts = self.accounts.lock().await;

        let available = accounts.get(from).copied().unwrap_or(0);
        if available < amount_sats {
            return Err(TransferError::InsufficientFunds {
                account: from.to_string(),
                available,
                required: amount_sats,
            });
        }

        let escrow_balance = accounts.get(escrow_account).copied().unwrap_or(0);
        let credited = escrow_balance
            .checked_add(amount_sats)
            .ok_or_else(|| TransferError::BalanceOverflow(escrow_account.to_string()))?;

        accounts.insert(from.to_string(), available - amount_sats);
        accounts.insert(escrow_account.to_string(), credited);

        Ok(())
    }

    async fn disburse(
        &self,
        escrow_account: &str,
        payouts: &[Payout],
    ) -> Result<(), TransferError> {
        let mut total: u64 = 0;
        for payout in payouts {
            total = total
                .checked_add(payout.amount_sats)
                .ok_or_else(|| TransferError::Rejected("payout total overflows".to_string()))?;
        }
        if total == 0 {
            return Err(TransferError::ZeroAmount);
        }

        let mut accounts = self.accounts.lock().await;

        let available = accounts.get(escrow_account).copied().unwrap_or(0);
        if available < total {
            return Err(TransferError::InsufficientFunds {
                account: escrow_account.to_string(),
                available,
                required: total,
            });
        }

        // Validate every credit before applying any of them
        for payout in payouts {
            let balance = accounts.get(&payout.to).copied().unwrap_or(0);
            if balance.checked_add(payout.amount_sats).is_none() {
                return Err(TransferError::BalanceOverflow(payout.to.clone()));
            }
        }

        accounts.insert(escrow_account.to_string(), available - total);
        for payout in payouts {
            let balance = accounts.entry(payout.to.clone()).or_insert(0);
            *balance += payout.amount_sats;
        }

        Ok(())
    }
}
