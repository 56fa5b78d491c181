//! # CropShield Engine
//!
//! Parametric crop insurance: farmers pay a premium against a weather
//! condition at a registered location, and coverage is paid out
//! automatically when an oracle reports a reading that crosses the
//! policy's threshold before it expires.
//!
//! ## Components
//!
//! - **Registry**: immutable locations keyed by id
//! - **Feed**: latest oracle reading per (location, condition)
//! - **Ledger**: policy records and their lifecycle
//! - **Evaluator**: trigger scan over matching Active policies
//! - **Escrow**: pooled premiums and top-ups, settlement on trigger
//! - **Journal**: hash-chained record of every state change
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       InsuranceEngine                        │
//! │                  RwLock<state>, one writer                   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌───────────┐               │
//! │  │ Registry  │   │   Feed    │──▶│ Evaluator │               │
//! │  └───────────┘   └───────────┘   └─────┬─────┘               │
//! │        ▲                               │                     │
//! │        │         ┌───────────┐   ┌─────▼─────┐   ┌─────────┐ │
//! │        └─────────│  Ledger   │◀──│  Escrow   │──▶│ Journal │ │
//! │                  └───────────┘   └─────┬─────┘   └─────────┘ │
//! └────────────────────────────────────────┼─────────────────────┘
//!                                          ▼
//!                                  FundsTransfer (external)
//! ```

pub mod access;
pub mod clock;
pub mod config;
pub mod engine;
pub mod escrow;
pub mod evaluator;
pub mod feed;
pub mod journal;
pub mod ledger;
pub mod registry;
pub mod transfer;

pub use access::AccessControl;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::InsuranceEngine;
pub use escrow::{Escrow, Settlement};
pub use evaluator::{DeferredPayout, EvaluationOutcome, PayoutEvaluator};
pub use feed::WeatherFeed;
pub use journal::{EventJournal, JournalEntry, LedgerEvent};
pub use ledger::PolicyLedger;
pub use registry::LocationRegistry;
pub use transfer::{AccountBook, FundsTransfer};

pub use cropshield_common as common;

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
