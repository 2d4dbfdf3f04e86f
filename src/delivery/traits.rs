use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::DeliveryError;
use crate::models::{Notification, NotificationMessage};

/// A channel notifications are delivered through.
///
/// Implementations report failures but never retry on behalf of the caller
/// beyond their own transport policy.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Delivers a rendered notification.
    async fn deliver(
        &self,
        notification: &Notification,
        message: &NotificationMessage,
    ) -> Result<(), DeliveryError>;
}
