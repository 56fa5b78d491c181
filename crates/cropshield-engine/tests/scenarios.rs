//! End-to-end scenarios for the insurance engine
//!
//! Drives the public engine surface the way the interaction tooling
//! does, with a manual clock and an in-memory account book.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use cropshield_engine::common::{
    AccessError, Address, ConditionKind, CropShieldError, ErrorKind, LocationId, PolicyId,
    PolicyRequest, PolicyStatus, RegistryError, SettlementError, MILLIS_PER_DAY,
};
use cropshield_engine::{
    AccountBook, Clock, EngineConfig, FundsTransfer, InsuranceEngine, LedgerEvent, ManualClock,
};

const START: i64 = 1_700_000_000_000;
const LOCATION: LocationId = LocationId(1);

/// Test harness wiring an engine to a manual clock and an account book
struct TestHarness {
    engine: InsuranceEngine,
    clock: Arc<ManualClock>,
    book: Arc<AccountBook>,
    operator: Address,
    oracle: Address,
    farmer: Address,
}

impl TestHarness {
    fn new() -> Self {
        let operator = Address::from("0xdeployer");
        let oracle = Address::from("0xstation");
        let config = EngineConfig {
            operator: operator.clone(),
            oracles: vec![oracle.clone()],
            ..EngineConfig::default()
        };

        let clock = Arc::new(ManualClock::new(START));
        let book = Arc::new(AccountBook::new());
        let farmer = Address::from("0xfarmer");
        book.deposit(&operator, dec!(100000)).unwrap();
        book.deposit(&farmer, dec!(10000)).unwrap();

        let engine = InsuranceEngine::new(config, clock.clone(), book.clone()).unwrap();
        engine
            .register_location(&operator, LOCATION, dec!(40.7128), dec!(-74.0060))
            .unwrap();

        Self {
            engine,
            clock,
            book,
            operator,
            oracle,
            farmer,
        }
    }

    fn open(&self, condition: ConditionKind, threshold: Decimal) -> PolicyId {
        self.engine
            .create_policy(
                &self.farmer,
                PolicyRequest {
                    location_id: LOCATION,
                    condition,
                    threshold,
                    expiry_days: 30,
                    premium: dec!(100),
                },
            )
            .unwrap()
    }

    fn report(&self, condition: ConditionKind, value: Decimal) -> Vec<PolicyId> {
        self.engine
            .submit_reading(
                &self.oracle,
                LOCATION,
                condition,
                value,
                self.clock.now_millis(),
            )
            .unwrap()
            .paid_ids()
    }

    fn status(&self, id: PolicyId) -> PolicyStatus {
        self.engine.policy(id).unwrap().status
    }

    fn farmer_balance(&self) -> Decimal {
        self.book.balance_of(&self.farmer)
    }
}

mod lifecycle_scenarios {
    use super::*;

    #[test]
    fn test_excess_rain_pays_out() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(500)).unwrap();
        let id = h.open(ConditionKind::ExcessRain, dec!(80));

        let view = h.engine.policy(id).unwrap();
        assert_eq!(view.coverage_amount, dec!(500));
        let escrow_before = h.engine.escrow_balance();
        let farmer_before = h.farmer_balance();

        assert_eq!(h.report(ConditionKind::ExcessRain, dec!(85)), vec![id]);
        assert_eq!(h.status(id), PolicyStatus::PaidOut);
        assert_eq!(h.engine.escrow_balance(), escrow_before - dec!(500));
        assert_eq!(h.farmer_balance(), farmer_before + dec!(500));
    }

    #[test]
    fn test_reading_below_threshold_keeps_policy_active() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(500)).unwrap();
        let id = h.open(ConditionKind::ExcessRain, dec!(80));

        assert!(h.report(ConditionKind::ExcessRain, dec!(75)).is_empty());
        assert_eq!(h.status(id), PolicyStatus::Active);
        assert_eq!(h.engine.escrow_balance(), dec!(600));
    }

    #[test]
    fn test_equal_to_threshold_does_not_trigger() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(500)).unwrap();
        let rain = h.open(ConditionKind::ExcessRain, dec!(80));
        let drought = h.open(ConditionKind::Drought, dec!(20));

        assert!(h.report(ConditionKind::ExcessRain, dec!(80)).is_empty());
        assert!(h.report(ConditionKind::Drought, dec!(20)).is_empty());
        assert_eq!(h.status(rain), PolicyStatus::Active);
        assert_eq!(h.status(drought), PolicyStatus::Active);
    }

    #[test]
    fn test_insufficient_funds_leaves_policy_active() {
        let h = TestHarness::new();
        let id = h.open(ConditionKind::ExcessRain, dec!(80));
        let escrow_before = h.engine.escrow_balance();

        let outcome = h
            .engine
            .evaluate(&h.oracle, LOCATION, ConditionKind::ExcessRain, dec!(90))
            .unwrap();
        assert!(outcome.paid.is_empty());
        assert_eq!(outcome.deferred.len(), 1);
        assert_eq!(h.status(id), PolicyStatus::Active);
        assert_eq!(h.engine.escrow_balance(), escrow_before);

        // A later matching reading after a top-up settles it
        h.engine.fund(&h.operator, dec!(400)).unwrap();
        assert_eq!(h.report(ConditionKind::ExcessRain, dec!(90)), vec![id]);
    }

    #[test]
    fn test_expired_policy_never_pays() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(500)).unwrap();
        let id = h.open(ConditionKind::Drought, dec!(20));

        h.clock.advance_days(31);
        let outcome = h
            .engine
            .submit_reading(&h.oracle, LOCATION, ConditionKind::Drought, dec!(5), h.clock.now_millis())
            .unwrap();

        assert!(outcome.paid.is_empty());
        assert_eq!(outcome.expired, vec![id]);
        assert_eq!(h.status(id), PolicyStatus::Expired);
        assert_eq!(h.engine.escrow_balance(), dec!(600));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(500)).unwrap();
        let id = h.open(ConditionKind::Frost, dec!(2));

        h.clock.advance_millis(30 * MILLIS_PER_DAY - 1);
        assert_eq!(h.engine.expire_if_due(id), Ok(false));

        h.clock.advance_millis(1);
        assert!(h.report(ConditionKind::Frost, dec!(1)).is_empty());
        assert_eq!(h.status(id), PolicyStatus::Expired);
    }

    #[test]
    fn test_policies_evaluated_in_id_order() {
        let h = TestHarness::new();
        let first = h.open(ConditionKind::ExcessRain, dec!(80));
        let second = h.open(ConditionKind::ExcessRain, dec!(50));
        let third = h.open(ConditionKind::ExcessRain, dec!(95));
        // 300 in premiums plus 400 funded covers exactly one payout
        h.engine.fund(&h.operator, dec!(400)).unwrap();

        let outcome = h
            .engine
            .submit_reading(&h.oracle, LOCATION, ConditionKind::ExcessRain, dec!(90), 0)
            .unwrap();
        assert_eq!(outcome.paid_ids(), vec![first]);
        assert_eq!(outcome.deferred.len(), 1);
        assert_eq!(outcome.deferred[0].policy_id, second);
        assert_eq!(h.status(third), PolicyStatus::Active);
    }
}

mod settlement_safety {
    use super::*;

    #[test]
    fn test_double_trigger_pays_once() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(5000)).unwrap();
        let id = h.open(ConditionKind::ExcessRain, dec!(80));

        assert_eq!(h.report(ConditionKind::ExcessRain, dec!(85)), vec![id]);
        let escrow_after_first = h.engine.escrow_balance();
        let farmer_after_first = h.farmer_balance();

        assert!(h.report(ConditionKind::ExcessRain, dec!(99)).is_empty());
        assert_eq!(h.engine.escrow_balance(), escrow_after_first);
        assert_eq!(h.farmer_balance(), farmer_after_first);

        assert_eq!(
            h.engine.payout(&h.oracle, id),
            Err(SettlementError::AlreadyPaid(id).into())
        );
    }

    #[test]
    fn test_terminal_states_are_final() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(5000)).unwrap();
        let paid = h.open(ConditionKind::ExcessRain, dec!(80));
        h.report(ConditionKind::ExcessRain, dec!(85));

        h.clock.advance_days(60);
        assert_eq!(h.engine.expire_if_due(paid), Ok(false));
        assert!(h.engine.expire_policies().unwrap().is_empty());
        assert_eq!(h.status(paid), PolicyStatus::PaidOut);

        let lapsed = h.open(ConditionKind::Drought, dec!(10));
        h.clock.advance_days(30);
        assert_eq!(h.engine.expire_policies().unwrap(), vec![lapsed]);
        assert!(h.engine.payout(&h.oracle, lapsed).is_err());
        assert_eq!(h.status(lapsed), PolicyStatus::Expired);
    }

    #[test]
    fn test_escrow_reconciles_with_flows() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(700)).unwrap();
        h.open(ConditionKind::ExcessRain, dec!(80));
        h.open(ConditionKind::Frost, dec!(2));
        h.report(ConditionKind::ExcessRain, dec!(81));

        let escrow = h.engine.escrow();
        assert!(escrow.is_reconciled());
        assert_eq!(escrow.total_premiums, dec!(200));
        assert_eq!(escrow.total_funded, dec!(700));
        assert_eq!(escrow.total_paid_out, dec!(500));
        assert_eq!(escrow.balance, dec!(400));

        let external_total = h.book.total();
        assert_eq!(external_total + escrow.balance, dec!(110000));
    }

    #[test]
    fn test_concurrent_readings_never_double_pay() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(50000)).unwrap();
        let ids: Vec<PolicyId> = (0..20)
            .map(|_| h.open(ConditionKind::ExcessRain, dec!(80)))
            .collect();
        let farmer_before = h.farmer_balance();

        std::thread::scope(|scope| {
            for value in 81..89 {
                let engine = &h.engine;
                let oracle = &h.oracle;
                scope.spawn(move || {
                    engine
                        .submit_reading(
                            oracle,
                            LOCATION,
                            ConditionKind::ExcessRain,
                            Decimal::from(value),
                            0,
                        )
                        .unwrap();
                });
            }
        });

        assert!(ids.iter().all(|id| h.status(*id) == PolicyStatus::PaidOut));
        assert_eq!(h.farmer_balance(), farmer_before + dec!(500) * dec!(20));
        let payouts = h
            .engine
            .journal()
            .iter()
            .filter(|entry| matches!(entry.event, LedgerEvent::PayoutExecuted { .. }))
            .count();
        assert_eq!(payouts, ids.len());
    }
}

mod payout_retry {
    use super::*;

    fn not_triggered(id: PolicyId, kind: ConditionKind) -> CropShieldError {
        SettlementError::NotTriggered {
            policy_id: id,
            kind,
        }
        .into()
    }

    #[test]
    fn test_reading_before_policy_creation_never_pays() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(1000)).unwrap();
        assert!(h.report(ConditionKind::ExcessRain, dec!(99)).is_empty());

        h.clock.advance_days(5);
        let id = h.open(ConditionKind::ExcessRain, dec!(80));
        let farmer_before = h.farmer_balance();

        assert_eq!(
            h.engine.payout(&h.oracle, id),
            Err(not_triggered(id, ConditionKind::ExcessRain))
        );
        assert_eq!(h.status(id), PolicyStatus::Active);
        assert_eq!(h.farmer_balance(), farmer_before);
        assert_eq!(h.engine.escrow_balance(), dec!(1100));

        // A reading reported while the policy exists does count
        assert_eq!(h.report(ConditionKind::ExcessRain, dec!(85)), vec![id]);
        assert_eq!(h.farmer_balance(), farmer_before + dec!(500));
    }

    #[test]
    fn test_non_triggering_reading_blocks_retry() {
        let h = TestHarness::new();
        h.engine.fund(&h.operator, dec!(500)).unwrap();
        let id = h.open(ConditionKind::ExcessRain, dec!(80));

        assert_eq!(
            h.engine.payout(&h.oracle, id),
            Err(not_triggered(id, ConditionKind::ExcessRain))
        );

        assert!(h.report(ConditionKind::ExcessRain, dec!(80)).is_empty());
        let err = h.engine.payout(&h.oracle, id).unwrap_err();
        assert_eq!(err, not_triggered(id, ConditionKind::ExcessRain));
        assert_eq!(err.kind(), ErrorKind::StaleState);
        assert_eq!(h.status(id), PolicyStatus::Active);
        assert_eq!(h.engine.escrow_balance(), dec!(600));
    }

    #[test]
    fn test_deferred_payout_settles_after_top_up() {
        let h = TestHarness::new();
        let id = h.open(ConditionKind::Drought, dec!(20));
        let farmer_before = h.farmer_balance();

        assert!(h.report(ConditionKind::Drought, dec!(5)).is_empty());
        assert_eq!(h.status(id), PolicyStatus::Active);
        assert_eq!(
            h.engine.payout(&h.oracle, id),
            Err(SettlementError::InsufficientFunds {
                required: dec!(500),
                available: dec!(100),
            }
            .into())
        );

        h.engine.fund(&h.operator, dec!(400)).unwrap();
        h.clock.advance_days(1);
        assert!(h.engine.payout(&h.oracle, id).is_ok());
        assert_eq!(h.status(id), PolicyStatus::PaidOut);
        assert_eq!(h.farmer_balance(), farmer_before + dec!(500));
        assert_eq!(h.engine.escrow_balance(), Decimal::ZERO);
        assert_eq!(
            h.engine.payout(&h.oracle, id),
            Err(SettlementError::AlreadyPaid(id).into())
        );
    }
}

mod capability_checks {
    use super::*;

    #[test]
    fn test_duplicate_location_is_noop_and_unchanged() {
        let h = TestHarness::new();
        let err = h
            .engine
            .register_location(&h.operator, LOCATION, dec!(10), dec!(10))
            .unwrap_err();

        assert_eq!(err, RegistryError::AlreadyExists(LOCATION).into());
        assert!(err.is_noop());
        assert!(err.is_recoverable());
        let stored = h.engine.location(LOCATION).unwrap();
        assert_eq!(stored.latitude, dec!(40.7128));
        assert_eq!(stored.longitude, dec!(-74.0060));
        assert_eq!(h.engine.location_count(), 1);
    }

    #[test]
    fn test_farmer_cannot_report_weather() {
        let h = TestHarness::new();
        let err = h
            .engine
            .submit_reading(&h.farmer, LOCATION, ConditionKind::Drought, dec!(1), 0)
            .unwrap_err();

        assert!(matches!(
            err,
            CropShieldError::Access(AccessError::Unauthorized { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_oracle_cannot_register_locations() {
        let h = TestHarness::new();
        let result = h
            .engine
            .register_location(&h.oracle, LocationId(2), dec!(0), dec!(0));
        assert!(matches!(result, Err(CropShieldError::Access(_))));
    }

    #[test]
    fn test_operator_cannot_be_revoked() {
        let h = TestHarness::new();
        let result = h.engine.revoke_oracle(&h.operator, &h.operator);
        assert_eq!(result, Err(AccessError::OperatorRevocation.into()));
        assert!(h.engine.revoke_oracle(&h.operator, &h.oracle).unwrap());
        assert!(h
            .engine
            .submit_reading(&h.oracle, LOCATION, ConditionKind::Frost, dec!(1), 0)
            .is_err());
    }

    #[test]
    fn test_policies_of_farmer() {
        let h = TestHarness::new();
        let a = h.open(ConditionKind::ExcessRain, dec!(80));
        let b = h.open(ConditionKind::Frost, dec!(1));

        let ids: Vec<PolicyId> = h
            .engine
            .policies_of(&h.farmer)
            .iter()
            .map(|view| view.id)
            .collect();
        assert_eq!(ids, vec![a, b]);
        assert!(h.engine.policies_of(&h.operator).is_empty());
    }

    #[test]
    fn test_latest_reading_replaces_previous() {
        let h = TestHarness::new();
        h.report(ConditionKind::Drought, dec!(40));
        h.report(ConditionKind::Drought, dec!(35));

        let latest = h
            .engine
            .latest_reading(LOCATION, ConditionKind::Drought)
            .unwrap();
        assert_eq!(latest.value, dec!(35));
        assert!(h
            .engine
            .latest_reading(LOCATION, ConditionKind::Frost)
            .is_none());
    }
}
