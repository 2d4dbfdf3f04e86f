use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{
    DeliveryConfig, HttpRetryConfig, deserialize_duration_from_ms,
    deserialize_duration_from_seconds,
};

fn default_threshold() -> f64 {
    10.0
}

fn default_repeat_interval_secs() -> u64 {
    3600
}

fn default_repeat_check_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_snapshot_channel_capacity() -> usize {
    1024
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_polling_interval() -> Duration {
    Duration::from_secs(6)
}

/// Settings of the HTTP balance feed.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BalanceSourceConfig {
    /// Endpoint returning a JSON object of account id to balance.
    pub url: Url,

    /// How often the endpoint is polled.
    #[serde(
        deserialize_with = "deserialize_duration_from_ms",
        default = "default_polling_interval"
    )]
    pub polling_interval_ms: Duration,

    /// Retry policy for failed requests.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// Application configuration for the balance sentinel.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Database URL for the SQLite database.
    pub database_url: String,

    /// Path to the accounts file. Resolved against the configuration
    /// directory.
    #[serde(skip_deserializing)]
    pub accounts_config_path: PathBuf,

    /// Threshold applied to accounts that do not set one.
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// Reminder cadence applied to accounts that do not set one.
    #[serde(default = "default_repeat_interval_secs")]
    pub default_repeat_interval_secs: u64,

    /// Period of the repeat scheduler tick.
    #[serde(
        deserialize_with = "deserialize_duration_from_ms",
        default = "default_repeat_check_interval"
    )]
    pub repeat_check_interval_ms: Duration,

    /// Capacity of the channel carrying balance snapshots to the monitor.
    #[serde(default = "default_snapshot_channel_capacity")]
    pub snapshot_channel_capacity: usize,

    /// The maximum time to wait for pending writes at shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout_secs: Duration,

    /// The HTTP balance feed. Embedders pushing snapshots themselves can
    /// leave it out.
    #[serde(default)]
    pub balance_source: Option<BalanceSourceConfig>,

    /// Where notifications are delivered.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            accounts_config_path: PathBuf::from("configs/accounts.yaml"),
            default_threshold: default_threshold(),
            default_repeat_interval_secs: default_repeat_interval_secs(),
            repeat_check_interval_ms: default_repeat_check_interval(),
            snapshot_channel_capacity: default_snapshot_channel_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            balance_source: None,
            delivery: DeliveryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading `app.yaml` from the configuration
    /// directory, with `BALANCE_SENTINEL__*` environment overrides.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)))
            .add_source(Environment::with_prefix("BALANCE_SENTINEL").separator("__"))
            .build()?;
        let mut config: Self = s.try_deserialize()?;

        config.accounts_config_path = Path::new(config_dir_str).join("accounts.yaml");

        Ok(config)
    }

    /// Creates a new `AppConfigBuilder`, mostly useful in tests.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for `AppConfig` instances.
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Sets the database URL.
    pub fn database_url(mut self, url: &str) -> Self {
        self.config.database_url = url.to_string();
        self
    }

    /// Sets the accounts file.
    pub fn accounts_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.accounts_config_path = path.into();
        self
    }

    /// Sets the repeat scheduler tick period.
    pub fn repeat_check_interval(mut self, interval: Duration) -> Self {
        self.config.repeat_check_interval_ms = interval;
        self
    }

    /// Sets the shutdown drain bound.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout_secs = timeout;
        self
    }

    /// Sets the HTTP balance feed.
    pub fn balance_source(mut self, source: BalanceSourceConfig) -> Self {
        self.config.balance_source = Some(source);
        self
    }

    /// Sets the delivery target.
    pub fn delivery(mut self, delivery: DeliveryConfig) -> Self {
        self.config.delivery = delivery;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> AppConfig {
        self.config
    }
}
