//! # CropShield Common
//!
//! Shared types, errors, and constants for the CropShield parametric
//! insurance engine.
//!
//! ## Core Types
//!
//! - [`Address`]: caller identity (farmer, oracle, operator, funder)
//! - [`Location`]: immutable geographic record keyed by [`LocationId`]
//! - [`ConditionKind`]: insured weather condition and its trigger direction
//! - [`Policy`]/[`PolicyView`]: coverage record and its read-only projection
//! - [`PolicyRequest`]: terms submitted when opening a policy
//! - [`WeatherReading`]: latest observation per (location, condition)
//! - [`EscrowAccount`]: pooled balance funding payouts
//!
//! ## Errors
//!
//! - [`CropShieldError`]: unified error with component variants
//! - [`ErrorKind`]: coarse taxonomy used by calling tooling

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{
    AccessError, CropShieldError, ErrorKind, PolicyError, RegistryError, Result,
    SettlementError, TransferError,
};
pub use types::{
    address::{Address, Role},
    condition::{Comparison, ConditionKind},
    escrow_account::EscrowAccount,
    location::{Location, LocationId},
    policy::{Policy, PolicyId, PolicyRequest, PolicyStatus, PolicyView},
    reading::WeatherReading,
};

/// CropShield version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default premium-to-coverage ratio
pub const DEFAULT_COVERAGE_MULTIPLIER: u32 = 5;

/// Milliseconds in one policy day
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Default number of journal entries retained in memory
pub const DEFAULT_JOURNAL_CAPACITY: usize = 10_000;
