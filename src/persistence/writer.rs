//! Write-behind queue for state persistence.
//!
//! The alerting core never waits on the database. Every write is enqueued on
//! an unbounded channel and applied by a single background task in the order
//! it was submitted, so writes for the same account land in submission order.
//! Failed writes are logged and dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::{
    models::{HealthStatus, NotificationRecord, StatusRecord},
    persistence::{
        error::PersistenceError,
        traits::{AccountStatusRepository, NotificationRepository},
    },
};

/// A single write waiting to be applied.
#[derive(Debug)]
pub enum WriteOp {
    /// Store the first record of an account.
    InsertStatus(StatusRecord),
    /// Change the status of an account that already has a record.
    UpdateStatus {
        /// The account to update.
        account_id: String,
        /// The new status.
        status: HealthStatus,
        /// When the change was observed.
        updated_at: DateTime<Utc>,
    },
    /// Append to the notification history.
    InsertNotification(NotificationRecord),
    /// Signals the sender once every write queued before it has been applied.
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle used to enqueue writes.
#[derive(Clone, Debug)]
pub struct StateWriter {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl StateWriter {
    /// Creates a writer handle and the task that drains it. The task must be
    /// spawned for writes to be applied; it finishes once every handle has
    /// been dropped and the queue is empty.
    pub fn new(
        status_repository: Arc<dyn AccountStatusRepository>,
        notification_repository: Arc<dyn NotificationRepository>,
    ) -> (Self, StateWriterTask) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = StateWriterTask { rx, status_repository, notification_repository };
        (Self { tx }, task)
    }

    /// Enqueues the first status record of an account.
    pub fn insert_status(&self, record: StatusRecord) -> Result<(), PersistenceError> {
        self.send(WriteOp::InsertStatus(record))
    }

    /// Enqueues a status change for an account.
    pub fn update_status(
        &self,
        account_id: impl Into<String>,
        status: HealthStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        self.send(WriteOp::UpdateStatus { account_id: account_id.into(), status, updated_at })
    }

    /// Enqueues a notification history entry.
    pub fn record_notification(&self, record: NotificationRecord) -> Result<(), PersistenceError> {
        self.send(WriteOp::InsertNotification(record))
    }

    /// Waits until every write enqueued before this call has been applied.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(WriteOp::Flush(done_tx))?;
        done_rx.await.map_err(|_| PersistenceError::WriterClosed)
    }

    fn send(&self, op: WriteOp) -> Result<(), PersistenceError> {
        self.tx.send(op).map_err(|_| PersistenceError::WriterClosed)
    }
}

/// Background task applying queued writes one at a time.
pub struct StateWriterTask {
    rx: mpsc::UnboundedReceiver<WriteOp>,
    status_repository: Arc<dyn AccountStatusRepository>,
    notification_repository: Arc<dyn NotificationRepository>,
}

impl StateWriterTask {
    /// Applies writes until every [`StateWriter`] handle is dropped and the
    /// queue is empty.
    pub async fn run(mut self) {
        tracing::debug!("State writer started.");
        let mut applied = 0u64;
        while let Some(op) = self.rx.recv().await {
            if self.apply(op).await {
                applied += 1;
            }
        }
        tracing::info!(applied, "State writer drained and stopped.");
    }

    /// Returns true if a write was applied successfully.
    async fn apply(&self, op: WriteOp) -> bool {
        let result = match op {
            WriteOp::InsertStatus(record) => {
                let account_id = record.account_id.clone();
                self.status_repository
                    .insert(&record)
                    .await
                    .map_err(|e| (account_id, "insert status", e))
            }
            WriteOp::UpdateStatus { account_id, status, updated_at } => {
                match self.status_repository.update(&account_id, status, updated_at).await {
                    Err(PersistenceError::NotFound(_)) => {
                        tracing::warn!(
                            account_id = %account_id,
                            "No stored status to update, inserting instead."
                        );
                        let record = StatusRecord::new(account_id.clone(), status, updated_at);
                        self.status_repository
                            .insert(&record)
                            .await
                            .map_err(|e| (account_id, "insert status", e))
                    }
                    other => other.map_err(|e| (account_id, "update status", e)),
                }
            }
            WriteOp::InsertNotification(record) => {
                let account_id = record.account_id.clone();
                self.notification_repository
                    .insert_notification(&record)
                    .await
                    .map_err(|e| (account_id, "insert notification", e))
            }
            WriteOp::Flush(done) => {
                // The caller may have stopped waiting.
                let _ = done.send(());
                return false;
            }
        };

        match result {
            Ok(()) => true,
            Err((account_id, operation, error)) => {
                tracing::error!(
                    account_id = %account_id,
                    operation,
                    error = %error,
                    "Failed to persist state, write dropped."
                );
                false
            }
        }
    }
}
