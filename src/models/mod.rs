//! This module contains the data models for the balance sentinel.

pub mod account;
pub mod health_status;
pub mod notification;
pub mod records;
pub mod snapshot;

pub use account::{Account, AccountConfig};
pub use health_status::HealthStatus;
pub use notification::{Notification, NotificationMessage};
pub use records::{NotificationRecord, StatusRecord};
pub use snapshot::BalanceSnapshot;
