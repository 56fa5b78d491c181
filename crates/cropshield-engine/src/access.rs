//! Capability checks
//!
//! Defines who may perform the privileged engine operations:
//! - The operator registers locations and manages the oracle set
//! - Oracles submit readings and trigger settlement
//! - Everyone else may open policies, fund escrow and run expiry checks

use std::collections::BTreeSet;

use tracing::warn;

use cropshield_common::{AccessError, Address, Role};

/// Capability table checked at the start of each privileged operation
#[derive(Debug, Clone)]
pub struct AccessControl {
    operator: Address,
    oracles: BTreeSet<Address>,
}

impl AccessControl {
    pub fn new(operator: Address, oracles: impl IntoIterator<Item = Address>) -> Self {
        Self {
            operator,
            oracles: oracles.into_iter().collect(),
        }
    }

    /// The operator implicitly holds every role
    pub fn has_role(&self, caller: &Address, role: Role) -> bool {
        if *caller == self.operator {
            return true;
        }
        match role {
            Role::Operator => false,
            Role::Oracle => self.oracles.contains(caller),
        }
    }

    pub fn require(&self, caller: &Address, role: Role) -> Result<(), AccessError> {
        if self.has_role(caller, role) {
            return Ok(());
        }
        warn!(caller = %caller, role = %role, "Capability check failed");
        Err(AccessError::Unauthorized {
            caller: caller.clone(),
            role,
        })
    }

    /// Returns false if `oracle` already held the capability
    pub fn grant_oracle(&mut self, oracle: Address) -> bool {
        self.oracles.insert(oracle)
    }

    /// Returns false if `oracle` did not hold the capability
    pub fn revoke_oracle(&mut self, oracle: &Address) -> Result<bool, AccessError> {
        if *oracle == self.operator {
            return Err(AccessError::OperatorRevocation);
        }
        Ok(self.oracles.remove(oracle))
    }
}
