//! Implementation of the NotificationRepository trait for SqliteStateRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use super::{from_millis, to_millis};
use crate::{
    models::NotificationRecord,
    persistence::{
        error::PersistenceError, sqlite::SqliteStateRepository, traits::NotificationRepository,
    },
};

// Helper struct for mapping from the database row
#[derive(sqlx::FromRow)]
struct LatestNotificationRow {
    account_id: String,
    last_sent_at: i64,
}

#[async_trait]
impl NotificationRepository for SqliteStateRepository {
    /// Appends a notification to the history.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn insert_notification(&self, record: &NotificationRecord) -> Result<(), PersistenceError> {
        self.execute_query_with_error_handling(
            "insert notification",
            sqlx::query("INSERT INTO notifications (account_id, status, created_at) VALUES (?, ?, ?)")
                .bind(&record.account_id)
                .bind(record.status.as_str())
                .bind(to_millis(record.created_at))
                .execute(&self.pool),
        )
        .await?;

        tracing::debug!(account_id = %record.account_id, status = %record.status, "Notification recorded.");
        Ok(())
    }

    /// Returns the most recent notification time for each account.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn latest_per_account(
        &self,
        account_ids: &[String],
    ) -> Result<HashMap<String, DateTime<Utc>>, PersistenceError> {
        if account_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT account_id, MAX(created_at) AS last_sent_at FROM notifications WHERE account_id IN (",
        );
        let mut separated = builder.separated(", ");
        for account_id in account_ids {
            separated.push_bind(account_id);
        }
        separated.push_unseparated(") GROUP BY account_id");

        let rows = self
            .execute_query_with_error_handling(
                "query latest notifications",
                builder.build_query_as::<LatestNotificationRow>().fetch_all(&self.pool),
            )
            .await?;

        let mut latest = HashMap::with_capacity(rows.len());
        for row in rows {
            latest.insert(row.account_id, from_millis(row.last_sent_at)?);
        }
        tracing::debug!(count = latest.len(), "Latest notification times retrieved.");
        Ok(latest)
    }
}
