//! Error types for the CropShield engine
//!
//! Provides a unified error type and component-specific error variants.
//! Every failure is returned to the immediate caller; nothing is swallowed.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{
    address::{Address, Role},
    condition::ConditionKind,
    location::LocationId,
    policy::{PolicyId, PolicyStatus},
};

/// Result type alias using CropShieldError
pub type Result<T> = std::result::Result<T, CropShieldError>;

/// Unified error type for CropShield operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CropShieldError {
    // Location registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // Policy ledger errors
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    // Escrow and settlement errors
    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    // Capability errors
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    // Value-transfer errors
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Location registry errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Location already exists: {0}")]
    AlreadyExists(LocationId),

    #[error("Location not found: {0}")]
    UnknownLocation(LocationId),

    #[error("Coordinates out of range: lat {latitude}, lon {longitude}")]
    InvalidCoordinates { latitude: Decimal, longitude: Decimal },
}

/// Policy ledger errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Policy not found: {0}")]
    UnknownPolicy(PolicyId),

    #[error("Premium must be positive, got {0}")]
    InvalidPremium(Decimal),

    #[error("Threshold must be positive, got {0}")]
    InvalidThreshold(Decimal),

    #[error("Expiry must be at least one day")]
    InvalidExpiry,

    #[error("Coverage calculation overflow for premium {premium}")]
    CoverageOverflow { premium: Decimal },

    #[error("Policy {policy_id} is not active (status: {status})")]
    NotActive {
        policy_id: PolicyId,
        status: PolicyStatus,
    },
}

/// Escrow and settlement errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettlementError {
    #[error("Policy {0} has already been paid out")]
    AlreadyPaid(PolicyId),

    #[error("Insufficient escrow funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("Escrow balance overflow crediting {amount}")]
    BalanceOverflow { amount: Decimal },

    #[error("No stored {kind} reading triggers policy {policy_id}")]
    NotTriggered {
        policy_id: PolicyId,
        kind: ConditionKind,
    },
}

/// Capability errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccessError {
    #[error("{caller} is not authorized to act as {role}")]
    Unauthorized { caller: Address, role: Role },

    #[error("The operator cannot lose its oracle capability")]
    OperatorRevocation,
}

/// Value-transfer primitive errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransferError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: Address,
        required: Decimal,
        available: Decimal,
    },
}

/// Coarse error taxonomy for calling tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidInput,
    Unauthorized,
    /// A transition was attempted from a state that no longer allows it
    StaleState,
    InsufficientFunds,
    Transfer,
    Internal,
}

impl CropShieldError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CropShieldError::Registry(e) => match e {
                RegistryError::AlreadyExists(_) => ErrorKind::AlreadyExists,
                RegistryError::UnknownLocation(_) => ErrorKind::NotFound,
                RegistryError::InvalidCoordinates { .. } => ErrorKind::InvalidInput,
            },
            CropShieldError::Policy(e) => match e {
                PolicyError::UnknownPolicy(_) => ErrorKind::NotFound,
                PolicyError::InvalidPremium(_)
                | PolicyError::InvalidThreshold(_)
                | PolicyError::InvalidExpiry
                | PolicyError::CoverageOverflow { .. } => ErrorKind::InvalidInput,
                PolicyError::NotActive { .. } => ErrorKind::StaleState,
            },
            CropShieldError::Settlement(e) => match e {
                SettlementError::AlreadyPaid(_) | SettlementError::NotTriggered { .. } => {
                    ErrorKind::StaleState
                }
                SettlementError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
                SettlementError::InvalidAmount(_) | SettlementError::BalanceOverflow { .. } => {
                    ErrorKind::InvalidInput
                }
            },
            CropShieldError::Access(_) => ErrorKind::Unauthorized,
            CropShieldError::Transfer(e) => match e {
                TransferError::InvalidAmount => ErrorKind::InvalidInput,
                TransferError::InsufficientBalance { .. } => ErrorKind::Transfer,
            },
            CropShieldError::Config(_)
            | CropShieldError::Serialization(_)
            | CropShieldError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The engine stayed consistent and the call can be retried later
    /// (after funding, or against a different id)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::AlreadyExists | ErrorKind::InsufficientFunds | ErrorKind::StaleState
        )
    }

    /// The requested outcome already holds, so tooling may continue
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            CropShieldError::Registry(RegistryError::AlreadyExists(_))
                | CropShieldError::Settlement(SettlementError::AlreadyPaid(_))
        )
    }
}

// Implement From for common external error types
impl From<serde_json::Error> for CropShieldError {
    fn from(err: serde_json::Error) -> Self {
        CropShieldError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for CropShieldError {
    fn from(err: config::ConfigError) -> Self {
        CropShieldError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for CropShieldError {
    fn from(err: anyhow::Error) -> Self {
        CropShieldError::Internal(err.to_string())
    }
}
