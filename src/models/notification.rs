//! Data models for notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{account::Account, health_status::HealthStatus};

/// A message to be sent in a notification, with a title and body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NotificationMessage {
    /// The title of the notification message.
    pub title: String,
    /// The body content of the notification message.
    pub body: String,
}

/// A single alert about an account's health.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Identifier of the account the alert is about.
    pub account_id: String,
    /// Display name of the account.
    pub account_name: String,
    /// The status being reported.
    pub status: HealthStatus,
    /// The balance that produced the status.
    pub balance: f64,
    /// The account's threshold at the time of sending.
    pub threshold: f64,
    /// When the notification was produced.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Creates a notification for an account.
    pub fn new(account: &Account, status: HealthStatus, balance: f64, at: DateTime<Utc>) -> Self {
        Self {
            account_id: account.id.clone(),
            account_name: account.display_name.clone(),
            status,
            balance,
            threshold: account.threshold,
            created_at: at,
        }
    }

    /// Renders the human readable message. The wording depends only on the
    /// status.
    pub fn render(&self) -> NotificationMessage {
        let name = &self.account_name;
        let balance = format!("{:.3}", self.balance);
        let threshold = self.threshold;

        match self.status {
            HealthStatus::Approaching => NotificationMessage {
                title: format!("Approaching low balance: {name}"),
                body: format!(
                    "Account {name} balance {balance} is approaching the low balance threshold of {threshold}"
                ),
            },
            HealthStatus::Unhealthy => NotificationMessage {
                title: format!("Low balance: {name}"),
                body: format!("Account {name} has a low balance of {balance}, threshold of {threshold}"),
            },
            HealthStatus::Resolved => NotificationMessage {
                title: format!("Balance back to normal: {name}"),
                body: format!("Account {name} balance {balance} is back to normal"),
            },
        }
    }
}
