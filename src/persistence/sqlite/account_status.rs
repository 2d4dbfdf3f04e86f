//! Implementation of the AccountStatusRepository trait for SqliteStateRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use super::{from_millis, to_millis};
use crate::{
    models::{HealthStatus, StatusRecord},
    persistence::{
        error::PersistenceError, sqlite::SqliteStateRepository, traits::AccountStatusRepository,
    },
};

// Helper struct for mapping from the database row
#[derive(sqlx::FromRow)]
struct AccountStatusRow {
    account_id: String,
    status: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<AccountStatusRow> for StatusRecord {
    type Error = PersistenceError;

    fn try_from(row: AccountStatusRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<HealthStatus>()
            .map_err(|e| PersistenceError::DecodeError(e.to_string()))?;
        Ok(StatusRecord {
            account_id: row.account_id,
            status,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

#[async_trait]
impl AccountStatusRepository for SqliteStateRepository {
    /// Retrieves the stored status records for the given accounts.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_many(
        &self,
        account_ids: &[String],
    ) -> Result<Vec<StatusRecord>, PersistenceError> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(count = account_ids.len(), "Querying for account statuses.");

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT account_id, status, created_at, updated_at FROM account_status WHERE account_id IN (",
        );
        let mut separated = builder.separated(", ");
        for account_id in account_ids {
            separated.push_bind(account_id);
        }
        separated.push_unseparated(") ORDER BY account_id");

        let rows = self
            .execute_query_with_error_handling(
                "query account statuses",
                builder.build_query_as::<AccountStatusRow>().fetch_all(&self.pool),
            )
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match StatusRecord::try_from(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // A row we cannot read is treated as absent.
                    tracing::error!(error = %e, "Skipping undecodable account status row.");
                }
            }
        }
        tracing::debug!(count = records.len(), "Account statuses retrieved.");
        Ok(records)
    }

    /// Stores the status record of an account.
    ///
    /// Written as an upsert so the one-row-per-account invariant holds even if
    /// a record appeared since the caller last looked.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn insert(&self, record: &StatusRecord) -> Result<(), PersistenceError> {
        tracing::debug!(account_id = %record.account_id, status = %record.status, "Inserting account status.");

        self.execute_query_with_error_handling(
            "insert account status",
            sqlx::query(
                r#"
                INSERT INTO account_status (account_id, status, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (account_id) DO UPDATE SET
                    status = excluded.status,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&record.account_id)
            .bind(record.status.as_str())
            .bind(to_millis(record.created_at))
            .bind(to_millis(record.updated_at))
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    /// Updates the status of an existing record.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn update(
        &self,
        account_id: &str,
        status: HealthStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        tracing::debug!(account_id, status = %status, "Updating account status.");

        let result = self
            .execute_query_with_error_handling(
                "update account status",
                sqlx::query(
                    "UPDATE account_status SET status = ?, updated_at = ? WHERE account_id = ?",
                )
                .bind(status.as_str())
                .bind(to_millis(updated_at))
                .bind(account_id)
                .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!("account status for '{account_id}'")));
        }
        Ok(())
    }
}
