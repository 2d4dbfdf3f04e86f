//! Durable records kept by the persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::health_status::HealthStatus;

/// The last known status of an account. At most one exists per account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// The account this record belongs to.
    pub account_id: String,
    /// The most recently observed status.
    pub status: HealthStatus,
    /// When the record was first written.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl StatusRecord {
    /// Creates a record for an account seen for the first time.
    pub fn new(account_id: impl Into<String>, status: HealthStatus, at: DateTime<Utc>) -> Self {
        Self { account_id: account_id.into(), status, created_at: at, updated_at: at }
    }
}

/// An entry of the append-only notification history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// The account that was notified about.
    pub account_id: String,
    /// The status reported by the notification.
    pub status: HealthStatus,
    /// When the notification was sent.
    pub created_at: DateTime<Utc>,
}
