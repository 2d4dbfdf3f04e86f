use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    delivery::{DeliveryError, DeliverySink},
    models::{HealthStatus, Notification, NotificationMessage},
};

/// A delivery sink that keeps every notification it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    delivered: Arc<Mutex<Vec<(Notification, NotificationMessage)>>>,
    fail: bool,
}

impl RecordingSink {
    /// Creates a sink that accepts every notification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that records every notification and then reports a
    /// delivery failure.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// The notifications received so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    /// The rendered messages received so far.
    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.delivered.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    /// The statuses of the notifications received so far.
    pub fn statuses(&self) -> Vec<HealthStatus> {
        self.delivered.lock().unwrap().iter().map(|(n, _)| n.status).collect()
    }

    /// Waits until at least `count` notifications arrived. Panics after
    /// `timeout`.
    pub async fn wait_for(&self, count: usize, timeout: Duration) {
        let waiting = async {
            while self.delivered.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        if tokio::time::timeout(timeout, waiting).await.is_err() {
            panic!(
                "expected {count} notifications, got {}",
                self.delivered.lock().unwrap().len()
            );
        }
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn deliver(
        &self,
        notification: &Notification,
        message: &NotificationMessage,
    ) -> Result<(), DeliveryError> {
        self.delivered.lock().unwrap().push((notification.clone(), message.clone()));
        if self.fail {
            return Err(DeliveryError::DeliveryFailed("recording sink set to fail".into()));
        }
        Ok(())
    }
}
