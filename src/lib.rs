#![warn(missing_docs)]
//! Balance Sentinel watches account balances, alerts when an account's health
//! changes and keeps reminding while an account stays unhealthy.

pub mod config;
pub mod delivery;
pub mod engine;
pub mod http_client;
pub mod models;
pub mod persistence;
pub mod providers;
pub mod supervisor;
pub mod test_helpers;
