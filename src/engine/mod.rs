//! The alerting engine: classification, transition detection, notification
//! dispatch and unhealthy reminders.

pub mod classifier;
pub mod dispatcher;
pub mod monitor;
pub mod repeat_scheduler;
pub mod status_store;

pub use classifier::classify;
pub use dispatcher::NotificationDispatcher;
pub use monitor::BalanceMonitor;
pub use repeat_scheduler::RepeatScheduler;
pub use status_store::{AccountStatusStore, Observation};
