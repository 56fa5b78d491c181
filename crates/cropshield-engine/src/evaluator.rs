//! Payout evaluator
//!
//! Compares an observed value against every Active policy at the same
//! (location, condition):
//! 1. Expiry runs first; a lapsed policy is never paid
//! 2. The condition's comparison decides the trigger (strict, no equality)
//! 3. Triggered policies settle through escrow in ascending id order
//!
//! Each policy settles or fails on its own; one policy's shortfall does
//! not stop the rest of the scan.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use cropshield_common::{
    ConditionKind, CropShieldError, LocationId, PolicyId, SettlementError,
};

use crate::escrow::{Escrow, Settlement};
use crate::ledger::PolicyLedger;
use crate::transfer::FundsTransfer;

/// Payout that could not be covered at evaluation time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeferredPayout {
    pub policy_id: PolicyId,
    pub required: Decimal,
    pub available: Decimal,
}

/// Result of evaluating one observation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationOutcome {
    /// Settled by this call, ascending by id
    pub paid: Vec<Settlement>,
    /// Lapsed during the expiry pass
    pub expired: Vec<PolicyId>,
    /// Triggered but left Active for lack of escrow funds
    pub deferred: Vec<DeferredPayout>,
    /// Triggered but the settlement failed for another reason
    #[serde(skip)]
    pub failed: Vec<(PolicyId, CropShieldError)>,
}

impl EvaluationOutcome {
    /// Ids of every policy paid by this call
    pub fn paid_ids(&self) -> Vec<PolicyId> {
        self.paid.iter().map(|s| s.policy_id).collect()
    }

    pub fn total_paid(&self) -> Decimal {
        self.paid.iter().map(|s| s.amount).sum()
    }
}

/// Stateless trigger scan over the ledger
#[derive(Debug, Default, Clone, Copy)]
pub struct PayoutEvaluator;

impl PayoutEvaluator {
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, ledger, escrow, funds))]
    pub fn evaluate(
        &self,
        ledger: &mut PolicyLedger,
        escrow: &mut Escrow,
        funds: &dyn FundsTransfer,
        now_millis: i64,
        location_id: LocationId,
        condition: ConditionKind,
        observed: Decimal,
    ) -> EvaluationOutcome {
        let mut outcome = EvaluationOutcome::default();

        for policy_id in ledger.active_candidates(location_id, condition) {
            match ledger.expire_if_due(policy_id, now_millis) {
                Ok(true) => {
                    info!(policy_id = %policy_id, "Policy expired before evaluation");
                    outcome.expired.push(policy_id);
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    outcome.failed.push((policy_id, err.into()));
                    continue;
                }
            }

            let Some(policy) = ledger.get(policy_id) else {
                continue;
            };
            if !policy.is_triggered_by(observed) {
                debug!(
                    policy_id = %policy_id,
                    threshold = %policy.threshold(),
                    observed = %observed,
                    "Threshold not crossed"
                );
                continue;
            }

            match escrow.payout(ledger, funds, policy_id) {
                Ok(settlement) => outcome.paid.push(settlement),
                Err(CropShieldError::Settlement(SettlementError::InsufficientFunds {
                    required,
                    available,
                })) => {
                    outcome.deferred.push(DeferredPayout {
                        policy_id,
                        required,
                        available,
                    });
                }
                Err(err) if err.is_noop() => {
                    debug!(policy_id = %policy_id, "Already settled, skipping");
                }
                Err(err) => {
                    warn!(policy_id = %policy_id, error = %err, "Settlement failed");
                    outcome.failed.push((policy_id, err));
                }
            }
        }

        outcome
    }
}
