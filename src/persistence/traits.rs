//! Repository contracts consumed by the alerting core.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use crate::{
    models::{HealthStatus, NotificationRecord, StatusRecord},
    persistence::error::PersistenceError,
};

/// Durable storage of the last known status of each account.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AccountStatusRepository: Send + Sync {
    /// Retrieves the stored records for the given accounts. Accounts without
    /// a record are absent from the result.
    async fn get_many(&self, account_ids: &[String])
    -> Result<Vec<StatusRecord>, PersistenceError>;

    /// Stores the record of an account that has none yet.
    async fn insert(&self, record: &StatusRecord) -> Result<(), PersistenceError>;

    /// Updates the status of an account that already has a record.
    /// Returns `PersistenceError::NotFound` if there is no such record.
    async fn update(
        &self,
        account_id: &str,
        status: HealthStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;
}

/// Durable, append-only history of sent notifications.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Appends a notification to the history.
    async fn insert_notification(&self, record: &NotificationRecord) -> Result<(), PersistenceError>;

    /// Returns the time of the most recent notification for each of the
    /// given accounts. Accounts never notified are absent from the result.
    async fn latest_per_account(
        &self,
        account_ids: &[String],
    ) -> Result<HashMap<String, DateTime<Utc>>, PersistenceError>;
}
