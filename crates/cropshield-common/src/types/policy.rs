//! Coverage policies and their lifecycle
//!
//! ```text
//! Active ──expiry──▶ Expired   (terminal)
//!   │
//!   └──trigger─────▶ PaidOut   (terminal)
//! ```
//!
//! Every field except `status` is fixed at creation. Records are never
//! deleted; terminal policies remain as audit records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::types::{
    address::Address, condition::ConditionKind, location::LocationId, reading::WeatherReading,
};
use crate::MILLIS_PER_DAY;

/// Monotonically assigned policy identifier, starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub u64);

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Policy lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Active,
    Expired,
    PaidOut,
}

impl PolicyStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PolicyStatus::Active)
    }
}

impl std::fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyStatus::Active => write!(f, "active"),
            PolicyStatus::Expired => write!(f, "expired"),
            PolicyStatus::PaidOut => write!(f, "paid_out"),
        }
    }
}

/// Terms a farmer submits when opening a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub location_id: LocationId,
    pub condition: ConditionKind,
    pub threshold: Decimal,
    pub expiry_days: u32,
    pub premium: Decimal,
}

impl PolicyRequest {
    /// Check the terms that do not depend on engine state
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.premium <= Decimal::ZERO {
            return Err(PolicyError::InvalidPremium(self.premium));
        }
        if self.threshold <= Decimal::ZERO {
            return Err(PolicyError::InvalidThreshold(self.threshold));
        }
        if self.expiry_days == 0 {
            return Err(PolicyError::InvalidExpiry);
        }
        Ok(())
    }

    /// Coverage payable for this premium under `multiplier`
    pub fn coverage(&self, multiplier: Decimal) -> Result<Decimal, PolicyError> {
        self.premium
            .checked_mul(multiplier)
            .ok_or(PolicyError::CoverageOverflow {
                premium: self.premium,
            })
    }
}

/// Coverage policy record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    id: PolicyId,
    farmer: Address,
    location_id: LocationId,
    condition: ConditionKind,
    threshold: Decimal,
    premium_paid: Decimal,
    coverage_amount: Decimal,
    /// Unix milliseconds
    created_at: i64,
    /// Unix milliseconds
    expires_at: i64,
    status: PolicyStatus,
}

impl Policy {
    /// Open an Active policy; coverage is computed here and never again
    pub fn open(
        id: PolicyId,
        farmer: Address,
        request: &PolicyRequest,
        multiplier: Decimal,
        now_millis: i64,
    ) -> Result<Self, PolicyError> {
        request.validate()?;
        let coverage_amount = request.coverage(multiplier)?;
        let expires_at =
            now_millis.saturating_add(i64::from(request.expiry_days) * MILLIS_PER_DAY);

        Ok(Self {
            id,
            farmer,
            location_id: request.location_id,
            condition: request.condition,
            threshold: request.threshold,
            premium_paid: request.premium,
            coverage_amount,
            created_at: now_millis,
            expires_at,
            status: PolicyStatus::Active,
        })
    }

    pub fn id(&self) -> PolicyId {
        self.id
    }

    pub fn farmer(&self) -> &Address {
        &self.farmer
    }

    pub fn location_id(&self) -> LocationId {
        self.location_id
    }

    pub fn condition(&self) -> ConditionKind {
        self.condition
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    pub fn premium_paid(&self) -> Decimal {
        self.premium_paid
    }

    pub fn coverage_amount(&self) -> Decimal {
        self.coverage_amount
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn status(&self) -> PolicyStatus {
        self.status
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }

    pub fn is_due(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at
    }

    /// Whether `observed` satisfies this policy's trigger
    pub fn is_triggered_by(&self, observed: Decimal) -> bool {
        self.condition.is_triggered(observed, self.threshold)
    }

    /// Whether a stored reading triggers this policy
    ///
    /// Only readings the engine received while the policy existed count;
    /// weather reported before creation is outside the coverage window.
    pub fn is_triggered_by_reading(&self, reading: &WeatherReading) -> bool {
        reading.location_id == self.location_id
            && reading.condition == self.condition
            && reading.received_at >= self.created_at
            && self.is_triggered_by(reading.value)
    }

    /// Active → Expired once `now >= expires_at`. Returns whether the
    /// transition happened; any other state is left alone.
    pub fn expire_if_due(&mut self, now_millis: i64) -> bool {
        if self.is_active() && self.is_due(now_millis) {
            self.status = PolicyStatus::Expired;
            return true;
        }
        false
    }

    /// Active → PaidOut. Only legal from Active.
    pub fn mark_paid_out(&mut self) -> Result<(), PolicyError> {
        if !self.is_active() {
            return Err(PolicyError::NotActive {
                policy_id: self.id,
                status: self.status,
            });
        }
        self.status = PolicyStatus::PaidOut;
        Ok(())
    }

    pub fn view(&self) -> PolicyView {
        PolicyView::from(self)
    }
}

/// Read-only projection of a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyView {
    pub id: PolicyId,
    pub farmer: Address,
    pub location_id: LocationId,
    pub condition: ConditionKind,
    pub threshold: Decimal,
    pub premium_paid: Decimal,
    pub coverage_amount: Decimal,
    pub created_at: i64,
    pub expires_at: i64,
    pub status: PolicyStatus,
}

impl From<&Policy> for PolicyView {
    fn from(policy: &Policy) -> Self {
        Self {
            id: policy.id,
            farmer: policy.farmer.clone(),
            location_id: policy.location_id,
            condition: policy.condition,
            threshold: policy.threshold,
            premium_paid: policy.premium_paid,
            coverage_amount: policy.coverage_amount,
            created_at: policy.created_at,
            expires_at: policy.expires_at,
            status: policy.status,
        }
    }
}
