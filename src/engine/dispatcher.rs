//! Turns a transition or a reminder into a delivered notification and a
//! history entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::task::TaskTracker;

use crate::{
    delivery::DeliverySink,
    models::{Account, HealthStatus, Notification, NotificationRecord},
    persistence::{StateWriter, error::PersistenceError},
};

/// Sends notifications through a [`DeliverySink`] without waiting for them.
pub struct NotificationDispatcher {
    sink: Arc<dyn DeliverySink>,
    writer: StateWriter,
    in_flight: TaskTracker,
}

impl NotificationDispatcher {
    /// Creates a new dispatcher.
    pub fn new(sink: Arc<dyn DeliverySink>, writer: StateWriter) -> Self {
        Self { sink, writer, in_flight: TaskTracker::new() }
    }

    /// Renders and sends a notification, then appends it to the history.
    ///
    /// Delivery runs in the background and its failures are only logged. The
    /// history entry is enqueued after the delivery has been started and
    /// regardless of its outcome. The returned error only concerns the history
    /// entry.
    pub fn notify(
        &self,
        account: &Account,
        status: HealthStatus,
        balance: f64,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let notification = Notification::new(account, status, balance, at);
        let message = notification.render();
        tracing::info!(
            account_id = %account.id,
            status = %status,
            balance,
            title = %message.title,
            "Sending notification."
        );

        let sink = self.sink.clone();
        self.in_flight.spawn(async move {
            if let Err(e) = sink.deliver(&notification, &message).await {
                tracing::error!(
                    account_id = %notification.account_id,
                    status = %notification.status,
                    error = %e,
                    "Failed to deliver notification."
                );
            }
        });

        self.writer
            .record_notification(NotificationRecord {
                account_id: account.id.clone(),
                status,
                created_at: at,
            })
            .inspect_err(|e| {
                tracing::error!(account_id = %account.id, error = %e, "Failed to enqueue notification record.");
            })
    }

    /// Waits for all deliveries started so far to finish.
    pub async fn wait_for_deliveries(&self) {
        self.in_flight.close();
        self.in_flight.wait().await;
        self.in_flight.reopen();
    }

    /// Number of deliveries still running.
    pub fn pending_deliveries(&self) -> usize {
        self.in_flight.len()
    }
}
