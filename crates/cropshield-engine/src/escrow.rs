//! Escrow & settlement
//!
//! Custodies pooled funds and pays coverage out on trigger. A payout
//! re-checks the policy state itself rather than trusting the caller,
//! commits `Active → PaidOut` and the escrow debit first, then moves
//! the funds; a failed transfer restores both.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cropshield_common::{
    Address, CropShieldError, EscrowAccount, PolicyError, PolicyId, PolicyStatus, Result,
    SettlementError,
};

use crate::ledger::PolicyLedger;
use crate::transfer::FundsTransfer;

/// Completed payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub policy_id: PolicyId,
    pub farmer: Address,
    pub amount: Decimal,
    /// Escrow balance after the debit
    pub escrow_balance: Decimal,
}

#[derive(Debug, Default, Clone)]
pub struct Escrow {
    account: EscrowAccount,
}

impl Escrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self) -> &EscrowAccount {
        &self.account
    }

    pub fn balance(&self) -> Decimal {
        self.account.balance
    }

    /// Credit a direct top-up
    pub fn fund(&mut self, amount: Decimal) -> std::result::Result<(), SettlementError> {
        self.account.fund(amount)
    }

    /// Credit a premium collected at policy creation
    pub fn credit_premium(&mut self, amount: Decimal) -> std::result::Result<(), SettlementError> {
        self.account.credit_premium(amount)
    }

    /// Pay a policy's coverage to its farmer
    ///
    /// Fails with `AlreadyPaid` if the policy is already settled,
    /// `NotActive` if it expired, and `InsufficientFunds` if the pool
    /// cannot cover it; in every failure case nothing changes.
    pub fn payout(
        &mut self,
        ledger: &mut PolicyLedger,
        funds: &dyn FundsTransfer,
        policy_id: PolicyId,
    ) -> Result<Settlement> {
        let policy = ledger
            .get(policy_id)
            .ok_or(PolicyError::UnknownPolicy(policy_id))?;

        match policy.status() {
            PolicyStatus::Active => {}
            PolicyStatus::PaidOut => return Err(SettlementError::AlreadyPaid(policy_id).into()),
            status @ PolicyStatus::Expired => {
                return Err(PolicyError::NotActive { policy_id, status }.into())
            }
        }

        let amount = policy.coverage_amount();
        let farmer = policy.farmer().clone();
        if !self.account.can_cover(amount) {
            warn!(
                policy_id = %policy_id,
                required = %amount,
                available = %self.account.balance,
                "Escrow cannot cover payout"
            );
            return Err(SettlementError::InsufficientFunds {
                required: amount,
                available: self.account.balance,
            }
            .into());
        }

        let policy_snapshot = policy.clone();
        let account_snapshot = self.account.clone();

        let committed = ledger
            .mark_paid_out(policy_id)
            .map_err(CropShieldError::from)
            .and_then(|()| self.account.debit_payout(amount).map_err(Into::into))
            .and_then(|()| funds.disburse(&farmer, amount).map_err(Into::into));

        if let Err(err) = committed {
            warn!(policy_id = %policy_id, error = %err, "Payout rolled back");
            ledger.restore(policy_snapshot);
            self.account = account_snapshot;
            return Err(err);
        }

        info!(
            policy_id = %policy_id,
            farmer = %farmer,
            amount = %amount,
            escrow_balance = %self.account.balance,
            "Payout settled"
        );

        Ok(Settlement {
            policy_id,
            farmer,
            amount,
            escrow_balance: self.account.balance,
        })
    }
}
