//! Core data types for the CropShield engine

pub mod address;
pub mod condition;
pub mod escrow_account;
pub mod location;
pub mod policy;
pub mod reading;
