//! Configuration module for the balance sentinel.

mod account_loader;
mod app_config;
mod delivery;
mod helpers;
mod http_retry;
mod loader;

pub use account_loader::{AccountConfigError, AccountLoader};
pub use app_config::{AppConfig, AppConfigBuilder, BalanceSourceConfig};
pub use delivery::DeliveryConfig;
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};
pub use http_retry::{HttpRetryConfig, JitterSetting};
pub use loader::{ConfigLoader, LoaderError};
