//! CropShield interaction binary
//!
//! Drives an in-process engine through one policy lifecycle: register a
//! location, fund escrow, open a policy, report a triggering reading and
//! show the settlement.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use config::ConfigError;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cropshield_engine::common::{
    Address, ConditionKind, LocationId, PolicyError, PolicyId, PolicyRequest,
};
use cropshield_engine::config::{CONFIG_FILE, ENV_PREFIX};
use cropshield_engine::{
    AccountBook, Clock, EngineConfig, FundsTransfer, InsuranceEngine, SystemClock, ENGINE_VERSION,
};

/// Parameters for the interaction walkthrough, read from `[scenario]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
struct ScenarioSettings {
    farmer: Address,
    /// External balance seeded for the operator and the farmer
    starting_balance: Decimal,
    location_id: LocationId,
    latitude: Decimal,
    longitude: Decimal,
    fund_amount: Decimal,
    premium: Decimal,
    /// 0 = excess rain, 1 = drought, 2 = frost
    condition_code: u8,
    threshold: Decimal,
    expiry_days: u32,
    reading: Decimal,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            farmer: Address::from("farmer"),
            starting_balance: Decimal::from(10_000),
            location_id: LocationId(1),
            latitude: Decimal::new(407128, 4),
            longitude: Decimal::new(-740060, 4),
            fund_amount: Decimal::from(500),
            premium: Decimal::from(100),
            condition_code: 0,
            threshold: Decimal::from(80),
            expiry_days: 30,
            reading: Decimal::from(85),
        }
    }
}

impl ScenarioSettings {
    /// Read `[scenario]` from `cropshield.toml` and `CROPSHIELD_SCENARIO__*` variables
    fn load() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        Self::from_config(&cfg)
    }

    fn from_config(cfg: &config::Config) -> Result<Self> {
        match cfg.get::<Self>("scenario") {
            Ok(settings) => Ok(settings),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting CropShield interaction v{}", ENGINE_VERSION);

    // Load configuration
    let config = EngineConfig::load()?;
    let scenario = ScenarioSettings::load()?;
    let operator = config.operator.clone();
    let farmer = scenario.farmer.clone();

    let condition = ConditionKind::from_code(scenario.condition_code)
        .ok_or_else(|| anyhow!("unknown condition code {}", scenario.condition_code))?;

    // Seed external balances
    let book = Arc::new(AccountBook::new());
    book.deposit(&operator, scenario.starting_balance)?;
    book.deposit(&farmer, scenario.starting_balance)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = InsuranceEngine::new(config, clock.clone(), book.clone())?;

    info!(account = %operator, "Interacting with engine");
    info!(balance = %book.balance_of(&operator), "Operator balance");

    // Never fund more than the operator can spare after the premium
    let spare = book.balance_of(&operator) - scenario.premium;
    let fund_amount = scenario.fund_amount.min(spare.max(Decimal::ZERO));
    info!(fund = %fund_amount, premium = %scenario.premium, "Planned amounts");

    match engine.register_location(
        &operator,
        scenario.location_id,
        scenario.latitude,
        scenario.longitude,
    ) {
        Ok(location) => info!(location_id = %location.id, "Location added"),
        Err(err) if err.is_noop() => {
            warn!(error = %err, "Location not added (may already exist)")
        }
        Err(err) => return Err(err.into()),
    }

    if let Err(err) = engine.fund(&operator, fund_amount) {
        error!(error = %err, "Funding escrow failed");
        return Err(err.into());
    }

    let request = PolicyRequest {
        location_id: scenario.location_id,
        condition,
        threshold: scenario.threshold,
        expiry_days: scenario.expiry_days,
        premium: scenario.premium,
    };
    let policy_id = match engine.create_policy(&farmer, request) {
        Ok(id) => id,
        Err(err) => {
            error!(error = %err, "Creating policy failed");
            return Err(err.into());
        }
    };

    print_policy(&engine, policy_id)?;
    info!(balance = %engine.escrow_balance(), "Escrow balance before payout");

    let timestamp = clock.now_millis();
    match engine.submit_reading(
        &operator,
        scenario.location_id,
        condition,
        scenario.reading,
        timestamp,
    ) {
        Ok(outcome) => {
            info!(value = %scenario.reading, paid = ?outcome.paid_ids(), "Weather reading submitted");
            for deferred in &outcome.deferred {
                warn!(
                    policy_id = %deferred.policy_id,
                    required = %deferred.required,
                    available = %deferred.available,
                    "Payout deferred"
                );
            }
        }
        Err(err) if err.is_recoverable() => warn!(error = %err, "Reading not applied"),
        Err(err) => return Err(err.into()),
    }

    match engine.policy(policy_id) {
        Some(view) => info!(status = %view.status, "Updated policy status"),
        None => warn!(policy_id = %policy_id, "Policy not found"),
    }
    info!(balance = %engine.escrow_balance(), "Escrow balance after payout");
    info!(balance = %book.balance_of(&farmer), farmer = %farmer, "Farmer balance");

    if !engine.verify_journal() {
        return Err(anyhow!("journal chain failed verification"));
    }
    info!(head = %engine.journal_head(), events = engine.journal().len(), "Interaction complete");

    Ok(())
}

fn print_policy(engine: &InsuranceEngine, policy_id: PolicyId) -> Result<()> {
    let view = engine
        .policy(policy_id)
        .ok_or(PolicyError::UnknownPolicy(policy_id))?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
