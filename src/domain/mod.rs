//! Core domain types and logic.

pub mod asset_type;
pub mod config_validation;
pub mod error;
pub mod holding;
pub mod money;
pub mod portfolio;
pub mod price_point;
pub mod trading;
pub mod transaction;
pub mod wallet;
