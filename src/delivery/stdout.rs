use async_trait::async_trait;

use super::{error::DeliveryError, traits::DeliverySink};
use crate::models::{Notification, NotificationMessage};

/// Prints notifications to standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    /// Creates a new `StdoutSink`.
    pub fn new() -> Self {
        Self
    }

    fn format(notification: &Notification, message: &NotificationMessage) -> String {
        format!(
            "=== {} [{}] {} ===\n{}\n",
            message.title,
            notification.status,
            notification.created_at.to_rfc3339(),
            message.body
        )
    }
}

#[async_trait]
impl DeliverySink for StdoutSink {
    async fn deliver(
        &self,
        notification: &Notification,
        message: &NotificationMessage,
    ) -> Result<(), DeliveryError> {
        println!("{}", Self::format(notification, message));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::models::{Account, HealthStatus};

    #[test]
    fn test_format_contains_title_status_and_body() {
        let account = Account::new("acc-1", "Relayer", 10.0, 60);
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let notification = Notification::new(&account, HealthStatus::Unhealthy, 9.0, at);
        let message = notification.render();

        let output = StdoutSink::format(&notification, &message);
        assert!(output.starts_with("=== Low balance: Relayer [unhealthy] 2023-11-14T22:13:20+00:00 ==="));
        assert!(output.contains(&message.body));
    }

    #[tokio::test]
    async fn test_deliver_always_succeeds() {
        let account = Account::new("acc-1", "Relayer", 10.0, 60);
        let notification =
            Notification::new(&account, HealthStatus::Resolved, 12.0, chrono::Utc::now());
        let message = notification.render();
        assert!(StdoutSink::new().deliver(&notification, &message).await.is_ok());
    }
}
