//! Monitored account definitions.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// An account entry as it appears in the accounts YAML file.
///
/// Optional fields fall back to the application-wide defaults when the file
/// is loaded.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct AccountConfig {
    /// Stable identifier of the account, used as the key everywhere.
    pub account_id: String,

    /// Human readable label used in notification messages.
    #[serde(default, alias = "alias")]
    pub display_name: Option<String>,

    /// Minimum acceptable balance.
    #[serde(default)]
    pub threshold: Option<f64>,

    /// How often, in seconds, to remind about an unhealthy account.
    #[serde(default, alias = "notification_frequency")]
    pub repeat_interval_secs: Option<u64>,
}

/// A monitored account with all defaults applied.
///
/// Built once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// Stable identifier of the account.
    pub id: String,
    /// Human readable label.
    pub display_name: String,
    /// Minimum acceptable balance, never negative.
    pub threshold: f64,
    /// Cadence of unhealthy reminders in seconds, always positive.
    pub repeat_interval_secs: u64,
}

impl Account {
    /// Creates a new account.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        threshold: f64,
        repeat_interval_secs: u64,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            threshold,
            repeat_interval_secs,
        }
    }

    /// The reminder cadence as a time delta, saturating for values chrono
    /// cannot represent. Account loading rejects those, so saturation only
    /// applies to hand-built accounts.
    pub fn repeat_interval(&self) -> TimeDelta {
        i64::try_from(self.repeat_interval_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_interval_in_seconds() {
        let account = Account::new("acc-1", "Hot wallet", 10.0, 3600);
        assert_eq!(account.repeat_interval(), TimeDelta::seconds(3600));
    }

    #[test]
    fn test_repeat_interval_saturates() {
        let account = Account::new("acc-1", "Hot wallet", 10.0, u64::MAX);
        assert_eq!(account.repeat_interval(), TimeDelta::MAX);
    }

    #[test]
    fn test_account_config_accepts_legacy_field_names() {
        let yaml = r#"{"account_id": "acc-1", "alias": "Relayer", "notification_frequency": 60}"#;
        let config: AccountConfig = serde_json::from_str(yaml).unwrap();
        assert_eq!(config.display_name.as_deref(), Some("Relayer"));
        assert_eq!(config.repeat_interval_secs, Some(60));
        assert_eq!(config.threshold, None);
    }
}
