//! Escrow account - pooled custody of premiums and operator funding
//!
//! Key characteristics:
//! - Credited by premiums and by direct funding from any caller
//! - Debited only by settlements, never below zero
//! - Running totals per flow for reconciliation
//! - Version field bumped on every mutation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SettlementError;

/// Pooled balance available to cover payouts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscrowAccount {
    /// Funds currently available for settlement
    pub balance: Decimal,

    /// Sum of all premiums received
    pub total_premiums: Decimal,

    /// Sum of all direct top-ups
    pub total_funded: Decimal,

    /// Sum of all settled coverage
    pub total_paid_out: Decimal,

    /// Incremented on every mutation
    pub version: u64,
}

impl EscrowAccount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a policy premium
    pub fn credit_premium(&mut self, amount: Decimal) -> Result<(), SettlementError> {
        self.credit(amount)?;
        self.total_premiums += amount;
        Ok(())
    }

    /// Credit a direct top-up
    pub fn fund(&mut self, amount: Decimal) -> Result<(), SettlementError> {
        self.credit(amount)?;
        self.total_funded += amount;
        Ok(())
    }

    #[inline]
    pub fn can_cover(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Debit settled coverage; rejected if it would drive the balance negative
    pub fn debit_payout(&mut self, amount: Decimal) -> Result<(), SettlementError> {
        if amount <= Decimal::ZERO {
            return Err(SettlementError::InvalidAmount(amount));
        }

        if !self.can_cover(amount) {
            return Err(SettlementError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }

        self.balance -= amount;
        self.total_paid_out += amount;
        self.touch();
        Ok(())
    }

    /// Inflows minus outflows must equal the balance
    pub fn is_reconciled(&self) -> bool {
        self.total_premiums + self.total_funded - self.total_paid_out == self.balance
    }

    fn credit(&mut self, amount: Decimal) -> Result<(), SettlementError> {
        if amount <= Decimal::ZERO {
            return Err(SettlementError::InvalidAmount(amount));
        }

        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(SettlementError::BalanceOverflow { amount })?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}

impl std::fmt::Display for EscrowAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EscrowAccount(balance={}, premiums={}, funded={}, paid_out={})",
            self.balance, self.total_premiums, self.total_funded, self.total_paid_out
        )
    }
}
