//! Electricity tariff comparison: candidate selection, annual cost
//! computation, commission matching and ranked result persistence.

pub mod candidate;
pub mod commission;
pub mod comparison;
pub mod config;
pub mod cost;
pub mod engine;
pub mod error;
pub mod store;
pub mod tariff;
pub mod types;
