//! Value-transfer primitive
//!
//! Moves funds between callers' external balances and the engine's
//! escrow. The engine invokes it while its write boundary is held, so
//! implementations must not call back into the engine.

use dashmap::DashMap;
use rust_decimal::Decimal;

use cropshield_common::{Address, TransferError};

/// External value transfer used for premiums, funding and payouts
pub trait FundsTransfer: Send + Sync {
    /// Pull `amount` from `from` into engine custody
    fn collect(&self, from: &Address, amount: Decimal) -> Result<(), TransferError>;

    /// Push `amount` from engine custody to `to`
    fn disburse(&self, to: &Address, amount: Decimal) -> Result<(), TransferError>;

    /// External balance of `who`
    fn balance_of(&self, who: &Address) -> Decimal;
}

/// In-memory external balances keyed by address
///
/// Stands in for the host ledger's native currency: tests and the
/// interaction binary seed it with [`AccountBook::deposit`].
#[derive(Debug, Default)]
pub struct AccountBook {
    balances: DashMap<Address, Decimal>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or top up an external balance
    pub fn deposit(&self, to: &Address, amount: Decimal) -> Result<(), TransferError> {
        if amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        *self.balances.entry(to.clone()).or_default() += amount;
        Ok(())
    }

    /// Total held across all accounts
    pub fn total(&self) -> Decimal {
        self.balances.iter().map(|entry| *entry.value()).sum()
    }
}

impl FundsTransfer for AccountBook {
    fn collect(&self, from: &Address, amount: Decimal) -> Result<(), TransferError> {
        if amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }

        let insufficient = |available| TransferError::InsufficientBalance {
            account: from.clone(),
            required: amount,
            available,
        };
        let mut balance = self
            .balances
            .get_mut(from)
            .ok_or_else(|| insufficient(Decimal::ZERO))?;
        if *balance < amount {
            return Err(insufficient(*balance));
        }

        *balance -= amount;
        Ok(())
    }

    fn disburse(&self, to: &Address, amount: Decimal) -> Result<(), TransferError> {
        self.deposit(to, amount)
    }

    fn balance_of(&self, who: &Address) -> Decimal {
        self.balances
            .get(who)
            .map(|balance| *balance)
            .unwrap_or(Decimal::ZERO)
    }
}
