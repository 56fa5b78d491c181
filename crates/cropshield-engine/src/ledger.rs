//! Policy ledger
//!
//! Owns every policy record and its lifecycle. Records are indexed by
//! (location, condition) so evaluation only visits matching policies,
//! and by farmer for owner queries. Ids are assigned in creation order,
//! so every index is already sorted ascending.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use cropshield_common::{
    Address, ConditionKind, LocationId, Policy, PolicyError, PolicyId, PolicyRequest,
};

#[derive(Debug, Clone)]
pub struct PolicyLedger {
    policies: BTreeMap<PolicyId, Policy>,
    by_trigger: HashMap<(LocationId, ConditionKind), Vec<PolicyId>>,
    by_farmer: HashMap<Address, Vec<PolicyId>>,
    next_id: u64,
}

impl Default for PolicyLedger {
    fn default() -> Self {
        Self {
            policies: BTreeMap::new(),
            by_trigger: HashMap::new(),
            by_farmer: HashMap::new(),
            next_id: 1,
        }
    }
}

impl PolicyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the next policy without recording it
    ///
    /// Lets the caller collect the premium between validation and
    /// [`PolicyLedger::commit`], so a failed transfer leaves no record.
    pub fn draft(
        &self,
        farmer: Address,
        request: &PolicyRequest,
        multiplier: Decimal,
        now_millis: i64,
    ) -> Result<Policy, PolicyError> {
        Policy::open(PolicyId(self.next_id), farmer, request, multiplier, now_millis)
    }

    /// Record a drafted policy and advance the id sequence
    pub fn commit(&mut self, policy: Policy) -> PolicyId {
        let id = policy.id();
        debug_assert_eq!(id.0, self.next_id, "policy drafted against a stale sequence");

        self.by_trigger
            .entry((policy.location_id(), policy.condition()))
            .or_default()
            .push(id);
        self.by_farmer
            .entry(policy.farmer().clone())
            .or_default()
            .push(id);
        self.policies.insert(id, policy);
        self.next_id += 1;
        id
    }

    pub fn get(&self, id: PolicyId) -> Option<&Policy> {
        self.policies.get(&id)
    }

    fn get_mut(&mut self, id: PolicyId) -> Result<&mut Policy, PolicyError> {
        self.policies
            .get_mut(&id)
            .ok_or(PolicyError::UnknownPolicy(id))
    }

    /// Idempotent expiry check; true only on the call that transitions
    pub fn expire_if_due(&mut self, id: PolicyId, now_millis: i64) -> Result<bool, PolicyError> {
        Ok(self.get_mut(id)?.expire_if_due(now_millis))
    }

    /// Active → PaidOut. Reserved for settlement.
    pub(crate) fn mark_paid_out(&mut self, id: PolicyId) -> Result<(), PolicyError> {
        self.get_mut(id)?.mark_paid_out()
    }

    /// Put back a record captured before a settlement that failed midway
    pub(crate) fn restore(&mut self, snapshot: Policy) {
        if let Some(slot) = self.policies.get_mut(&snapshot.id()) {
            *slot = snapshot;
        }
    }

    /// Active policies for a (location, condition), ascending by id
    pub fn active_candidates(&self, location_id: LocationId, condition: ConditionKind) -> Vec<PolicyId> {
        self.by_trigger
            .get(&(location_id, condition))
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.policies.get(id).is_some_and(Policy::is_active))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All Active policies, ascending by id
    pub fn active_ids(&self) -> Vec<PolicyId> {
        self.policies
            .values()
            .filter(|policy| policy.is_active())
            .map(Policy::id)
            .collect()
    }

    /// Policies opened by `farmer`, ascending by id
    pub fn by_farmer(&self, farmer: &Address) -> Vec<&Policy> {
        self.by_farmer
            .get(farmer)
            .map(|ids| ids.iter().filter_map(|id| self.policies.get(id)).collect())
            .unwrap_or_default()
    }

    /// Number of policies ever committed
    pub fn count(&self) -> usize {
        self.policies.len()
    }
}
