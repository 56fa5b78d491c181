//! Insurance engine - the single authority over all ledger state
//!
//! Every mutating operation takes the write side of one lock for its
//! whole duration, which places it in a single total order with every
//! other mutation. Queries take the read side and therefore observe a
//! state between two mutations, never a partial write. Callers only
//! ever receive copies.

use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use cropshield_common::{
    Address, ConditionKind, CropShieldError, EscrowAccount, Location, LocationId, PolicyError,
    PolicyId, PolicyRequest, PolicyView, Result, Role, SettlementError, WeatherReading,
};

use crate::access::AccessControl;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::escrow::{Escrow, Settlement};
use crate::evaluator::{EvaluationOutcome, PayoutEvaluator};
use crate::feed::WeatherFeed;
use crate::journal::{EventJournal, JournalEntry, LedgerEvent};
use crate::ledger::PolicyLedger;
use crate::registry::LocationRegistry;
use crate::transfer::FundsTransfer;

struct EngineState {
    access: AccessControl,
    locations: LocationRegistry,
    feed: WeatherFeed,
    policies: PolicyLedger,
    escrow: Escrow,
    journal: EventJournal,
}

impl EngineState {
    fn record_outcome(&mut self, outcome: &EvaluationOutcome, now_millis: i64) -> Result<()> {
        for policy_id in &outcome.expired {
            self.journal.append(
                LedgerEvent::PolicyExpired {
                    policy_id: *policy_id,
                },
                now_millis,
            )?;
        }
        for settlement in &outcome.paid {
            self.journal.append(payout_event(settlement), now_millis)?;
        }
        for deferred in &outcome.deferred {
            self.journal.append(
                LedgerEvent::PayoutDeferred {
                    policy_id: deferred.policy_id,
                    required: deferred.required,
                    available: deferred.available,
                },
                now_millis,
            )?;
        }
        Ok(())
    }
}

fn payout_event(settlement: &Settlement) -> LedgerEvent {
    LedgerEvent::PayoutExecuted {
        policy_id: settlement.policy_id,
        farmer: settlement.farmer.clone(),
        amount: settlement.amount,
        balance: settlement.escrow_balance,
    }
}

/// Parametric insurance engine
pub struct InsuranceEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    funds: Arc<dyn FundsTransfer>,
    evaluator: PayoutEvaluator,
    state: RwLock<EngineState>,
}

impl InsuranceEngine {
    /// Create an engine with empty tables
    pub fn new(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        funds: Arc<dyn FundsTransfer>,
    ) -> Result<Self> {
        config.validate()?;

        let state = EngineState {
            access: AccessControl::new(config.operator.clone(), config.oracles.iter().cloned()),
            locations: LocationRegistry::new(),
            feed: WeatherFeed::new(),
            policies: PolicyLedger::new(),
            escrow: Escrow::new(),
            journal: EventJournal::new(config.journal_capacity),
        };

        info!(
            operator = %config.operator,
            oracles = config.oracles.len(),
            coverage_multiplier = %config.coverage_multiplier,
            "Insurance engine initialized"
        );

        Ok(Self {
            config,
            clock,
            funds,
            evaluator: PayoutEvaluator,
            state: RwLock::new(state),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn coverage_multiplier(&self) -> Decimal {
        self.config.coverage_multiplier
    }

    // ============ LOCATION REGISTRY ============

    /// Register an immutable location; a duplicate id is rejected, never overwritten
    #[instrument(skip(self))]
    pub fn register_location(
        &self,
        caller: &Address,
        location_id: LocationId,
        latitude: Decimal,
        longitude: Decimal,
    ) -> Result<Location> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.access.require(caller, Role::Operator)?;

        let location = Location::new(location_id, latitude, longitude)?;
        state.locations.register(location.clone())?;
        state.journal.append(
            LedgerEvent::LocationRegistered {
                location_id,
                latitude,
                longitude,
            },
            self.clock.now_millis(),
        )?;

        info!(location_id = %location_id, "Location registered");
        Ok(location)
    }

    pub fn location(&self, location_id: LocationId) -> Option<Location> {
        self.state.read().locations.get(location_id).cloned()
    }

    pub fn location_count(&self) -> usize {
        self.state.read().locations.count()
    }

    // ============ CAPABILITIES ============

    /// Allow `oracle` to submit readings. Returns false if it already could.
    #[instrument(skip(self))]
    pub fn grant_oracle(&self, caller: &Address, oracle: Address) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.access.require(caller, Role::Operator)?;

        let granted = state.access.grant_oracle(oracle.clone());
        if granted {
            info!(oracle = %oracle, "Oracle capability granted");
            state
                .journal
                .append(LedgerEvent::OracleGranted { oracle }, self.clock.now_millis())?;
        }
        Ok(granted)
    }

    /// Withdraw the oracle capability. Returns false if `oracle` did not hold it.
    #[instrument(skip(self))]
    pub fn revoke_oracle(&self, caller: &Address, oracle: &Address) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.access.require(caller, Role::Operator)?;

        let revoked = state.access.revoke_oracle(oracle)?;
        if revoked {
            info!(oracle = %oracle, "Oracle capability revoked");
            state.journal.append(
                LedgerEvent::OracleRevoked {
                    oracle: oracle.clone(),
                },
                self.clock.now_millis(),
            )?;
        }
        Ok(revoked)
    }

    pub fn has_role(&self, caller: &Address, role: Role) -> bool {
        self.state.read().access.has_role(caller, role)
    }

    // ============ ESCROW ============

    /// Top up the payout pool from `funder`'s external balance
    ///
    /// Returns the escrow balance after the credit.
    #[instrument(skip(self))]
    pub fn fund(&self, funder: &Address, amount: Decimal) -> Result<Decimal> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if amount <= Decimal::ZERO {
            return Err(SettlementError::InvalidAmount(amount).into());
        }
        if state.escrow.balance().checked_add(amount).is_none() {
            return Err(SettlementError::BalanceOverflow { amount }.into());
        }

        self.funds.collect(funder, amount)?;
        let credited = state.escrow.fund(amount);
        self.refund_on_failure(funder, amount, credited)?;

        let balance = state.escrow.balance();
        state.journal.append(
            LedgerEvent::EscrowFunded {
                funder: funder.clone(),
                amount,
                balance,
            },
            self.clock.now_millis(),
        )?;

        info!(funder = %funder, amount = %amount, balance = %balance, "Escrow funded");
        Ok(balance)
    }

    /// Snapshot of the pooled account
    pub fn escrow(&self) -> EscrowAccount {
        self.state.read().escrow.account().clone()
    }

    pub fn escrow_balance(&self) -> Decimal {
        self.state.read().escrow.balance()
    }

    /// External balance of `who` as reported by the transfer primitive
    pub fn external_balance(&self, who: &Address) -> Decimal {
        self.funds.balance_of(who)
    }

    // ============ POLICY LEDGER ============

    /// Open a policy for `farmer`, collecting the premium into escrow
    ///
    /// All-or-nothing: if the premium cannot be collected no record is
    /// created and no id is consumed.
    #[instrument(skip(self))]
    pub fn create_policy(&self, farmer: &Address, request: PolicyRequest) -> Result<PolicyId> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let now = self.clock.now_millis();

        state.locations.ensure_exists(request.location_id)?;
        let policy = state.policies.draft(
            farmer.clone(),
            &request,
            self.config.coverage_multiplier,
            now,
        )?;
        if state.escrow.balance().checked_add(request.premium).is_none() {
            return Err(SettlementError::BalanceOverflow {
                amount: request.premium,
            }
            .into());
        }

        self.funds.collect(farmer, request.premium)?;
        let credited = state.escrow.credit_premium(request.premium);
        self.refund_on_failure(farmer, request.premium, credited)?;

        let event = LedgerEvent::PolicyCreated {
            policy_id: policy.id(),
            farmer: farmer.clone(),
            location_id: policy.location_id(),
            condition: policy.condition(),
            threshold: policy.threshold(),
            premium: policy.premium_paid(),
            coverage: policy.coverage_amount(),
            expires_at: policy.expires_at(),
        };
        let policy_id = state.policies.commit(policy);
        state.journal.append(event, now)?;

        info!(policy_id = %policy_id, farmer = %farmer, "Policy created");
        Ok(policy_id)
    }

    pub fn policy(&self, policy_id: PolicyId) -> Option<PolicyView> {
        self.state.read().policies.get(policy_id).map(|p| p.view())
    }

    /// Policies opened by `farmer`, ascending by id
    pub fn policies_of(&self, farmer: &Address) -> Vec<PolicyView> {
        self.state
            .read()
            .policies
            .by_farmer(farmer)
            .into_iter()
            .map(|p| p.view())
            .collect()
    }

    pub fn policy_count(&self) -> usize {
        self.state.read().policies.count()
    }

    /// Expire `policy_id` if its term has lapsed
    ///
    /// Idempotent: returns true only on the call that performs the
    /// transition; any caller may invoke it.
    #[instrument(skip(self))]
    pub fn expire_if_due(&self, policy_id: PolicyId) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let now = self.clock.now_millis();

        let expired = state.policies.expire_if_due(policy_id, now)?;
        if expired {
            info!(policy_id = %policy_id, "Policy expired");
            state
                .journal
                .append(LedgerEvent::PolicyExpired { policy_id }, now)?;
        }
        Ok(expired)
    }

    /// Expire every Active policy whose term has lapsed
    #[instrument(skip(self))]
    pub fn expire_policies(&self) -> Result<Vec<PolicyId>> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let now = self.clock.now_millis();

        let mut expired = Vec::new();
        for policy_id in state.policies.active_ids() {
            if let Ok(true) = state.policies.expire_if_due(policy_id, now) {
                state
                    .journal
                    .append(LedgerEvent::PolicyExpired { policy_id }, now)?;
                expired.push(policy_id);
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Expired lapsed policies");
        }
        Ok(expired)
    }

    // ============ ORACLE FEED & EVALUATION ============

    /// Record a reading and evaluate every matching policy against it
    ///
    /// The evaluation runs inside this call; its payouts are visible as
    /// soon as it returns.
    #[instrument(skip(self))]
    pub fn submit_reading(
        &self,
        oracle: &Address,
        location_id: LocationId,
        condition: ConditionKind,
        value: Decimal,
        timestamp: i64,
    ) -> Result<EvaluationOutcome> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.access.require(oracle, Role::Oracle)?;
        state.locations.ensure_exists(location_id)?;

        let now = self.clock.now_millis();
        state
            .feed
            .record(WeatherReading::new(location_id, condition, value, timestamp, now));
        state.journal.append(
            LedgerEvent::WeatherReported {
                oracle: oracle.clone(),
                location_id,
                condition,
                value,
                timestamp,
            },
            now,
        )?;

        let outcome = self.evaluator.evaluate(
            &mut state.policies,
            &mut state.escrow,
            self.funds.as_ref(),
            now,
            location_id,
            condition,
            value,
        );
        state.record_outcome(&outcome, now)?;

        info!(
            location_id = %location_id,
            condition = %condition,
            value = %value,
            paid = outcome.paid.len(),
            deferred = outcome.deferred.len(),
            "Weather reading processed"
        );
        Ok(outcome)
    }

    /// Evaluate matching policies against `observed` without recording a reading
    #[instrument(skip(self))]
    pub fn evaluate(
        &self,
        caller: &Address,
        location_id: LocationId,
        condition: ConditionKind,
        observed: Decimal,
    ) -> Result<EvaluationOutcome> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.access.require(caller, Role::Oracle)?;

        let now = self.clock.now_millis();
        let outcome = self.evaluator.evaluate(
            &mut state.policies,
            &mut state.escrow,
            self.funds.as_ref(),
            now,
            location_id,
            condition,
            observed,
        );
        state.record_outcome(&outcome, now)?;
        Ok(outcome)
    }

    /// Settle one policy against the latest stored reading for its trigger
    ///
    /// Used to retry a payout that was deferred for lack of funds once
    /// escrow has been topped up. Expiry is checked first, and a reading
    /// stored before the policy was created never counts.
    #[instrument(skip(self))]
    pub fn payout(&self, caller: &Address, policy_id: PolicyId) -> Result<Settlement> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.access.require(caller, Role::Oracle)?;
        let now = self.clock.now_millis();

        if state.policies.expire_if_due(policy_id, now)? {
            info!(policy_id = %policy_id, "Policy expired before payout");
            state
                .journal
                .append(LedgerEvent::PolicyExpired { policy_id }, now)?;
        }

        let policy = state
            .policies
            .get(policy_id)
            .ok_or(PolicyError::UnknownPolicy(policy_id))?;
        if policy.is_active() {
            let triggered = state
                .feed
                .latest(policy.location_id(), policy.condition())
                .is_some_and(|reading| policy.is_triggered_by_reading(reading));
            if !triggered {
                return Err(SettlementError::NotTriggered {
                    policy_id,
                    kind: policy.condition(),
                }
                .into());
            }
        }

        match state
            .escrow
            .payout(&mut state.policies, self.funds.as_ref(), policy_id)
        {
            Ok(settlement) => {
                state.journal.append(payout_event(&settlement), now)?;
                Ok(settlement)
            }
            Err(CropShieldError::Settlement(SettlementError::InsufficientFunds {
                required,
                available,
            })) => {
                state.journal.append(
                    LedgerEvent::PayoutDeferred {
                        policy_id,
                        required,
                        available,
                    },
                    now,
                )?;
                Err(SettlementError::InsufficientFunds {
                    required,
                    available,
                }
                .into())
            }
            Err(err) => Err(err),
        }
    }

    pub fn latest_reading(
        &self,
        location_id: LocationId,
        condition: ConditionKind,
    ) -> Option<WeatherReading> {
        self.state.read().feed.latest(location_id, condition).cloned()
    }

    // ============ JOURNAL ============

    /// Retained journal entries, oldest first
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state.read().journal.entries().cloned().collect()
    }

    /// Hex digest of the newest journal entry
    pub fn journal_head(&self) -> String {
        self.state.read().journal.head()
    }

    pub fn verify_journal(&self) -> bool {
        self.state.read().journal.verify_chain()
    }

    /// Return `amount` to `payer` if crediting escrow failed after collection
    fn refund_on_failure(
        &self,
        payer: &Address,
        amount: Decimal,
        credited: std::result::Result<(), SettlementError>,
    ) -> Result<()> {
        let Err(err) = credited else {
            return Ok(());
        };

        warn!(payer = %payer, amount = %amount, error = %err, "Escrow credit failed, refunding");
        self.funds.disburse(payer, amount).map_err(|refund| {
            CropShieldError::Internal(format!(
                "refund of {amount} to {payer} failed after {err}: {refund}"
            ))
        })?;
        Err(err.into())
    }
}
