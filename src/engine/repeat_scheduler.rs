//! Periodic reminders for accounts that stay unhealthy.
//!
//! All tracked accounts share a single low-frequency tick instead of owning a
//! timer each. A reminder can therefore fire up to one tick period late. The
//! tick only runs while at least one account is tracked.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::dispatcher::NotificationDispatcher;
use crate::models::{Account, HealthStatus};

/// A tracked unhealthy account.
#[derive(Debug, Clone)]
struct ScheduledEntry {
    account: Account,
    last_known_balance: f64,
    next_due_at: DateTime<Utc>,
}

/// Re-sends unhealthy notifications on each account's cadence.
pub struct RepeatScheduler {
    dispatcher: Arc<NotificationDispatcher>,
    tick_interval: Duration,
    entries: HashMap<String, ScheduledEntry>,
    /// Last send time per account recovered at startup. Each entry is used by
    /// the first `add_account` for that account only.
    last_notifications: HashMap<String, DateTime<Utc>>,
    ticker: Option<Interval>,
}

impl RepeatScheduler {
    /// Creates a scheduler checking for due reminders every `tick_interval`.
    pub fn new(dispatcher: Arc<NotificationDispatcher>, tick_interval: Duration) -> Self {
        Self {
            dispatcher,
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            entries: HashMap::new(),
            last_notifications: HashMap::new(),
            ticker: None,
        }
    }

    /// Seeds the last send time of each account, as read from the
    /// notification history at startup.
    pub fn restore_last_notifications(&mut self, last_sent: HashMap<String, DateTime<Utc>>) {
        tracing::info!(count = last_sent.len(), "Restored last notification times.");
        self.last_notifications = last_sent;
    }

    /// Starts tracking an unhealthy account, or refreshes an already tracked
    /// one.
    ///
    /// A new entry is first due one interval after the recovered last send
    /// time if there is one, otherwise one interval from `now`. Refreshing a
    /// tracked account pushes its due time to one interval from `now` and
    /// stores the new balance. Neither case sends a notification.
    pub fn add_account(&mut self, account: &Account, balance: f64, now: DateTime<Utc>) {
        let interval = account.repeat_interval();

        if let Some(entry) = self.entries.get_mut(&account.id) {
            entry.last_known_balance = balance;
            entry.next_due_at = add_saturating(now, interval);
            tracing::debug!(
                account_id = %account.id,
                next_due_at = %entry.next_due_at,
                "Refreshed tracked account."
            );
            return;
        }

        let next_due_at = match self.last_notifications.remove(&account.id) {
            Some(last_sent) => add_saturating(last_sent, interval),
            None => add_saturating(now, interval),
        };
        tracing::info!(account_id = %account.id, %next_due_at, "Tracking unhealthy account.");
        self.entries.insert(
            account.id.clone(),
            ScheduledEntry { account: account.clone(), last_known_balance: balance, next_due_at },
        );
        self.ensure_ticking();
    }

    /// Stops tracking an account. Returns whether it was tracked.
    pub fn remove_account(&mut self, account_id: &str) -> bool {
        let removed = self.entries.remove(account_id).is_some();
        if removed {
            tracing::info!(account_id, "Stopped tracking account.");
        }
        if self.entries.is_empty() && self.ticker.take().is_some() {
            tracing::debug!("No tracked accounts left, repeat tick stopped.");
        }
        removed
    }

    /// Whether the account is currently tracked.
    pub fn is_tracked(&self, account_id: &str) -> bool {
        self.entries.contains_key(account_id)
    }

    /// When the account's next reminder is due.
    pub fn next_due(&self, account_id: &str) -> Option<DateTime<Utc>> {
        self.entries.get(account_id).map(|entry| entry.next_due_at)
    }

    /// Number of tracked accounts.
    pub fn tracked_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the periodic tick is running.
    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Waits for the next tick. Never completes while the tick is stopped.
    pub async fn next_tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Sends a reminder for every entry due at `now` and reschedules it one
    /// interval later. Returns the number of reminders sent.
    pub fn fire_due(&mut self, now: DateTime<Utc>) -> usize {
        let mut fired = 0;
        for entry in self.entries.values_mut() {
            if entry.next_due_at > now {
                continue;
            }
            tracing::info!(
                account_id = %entry.account.id,
                balance = entry.last_known_balance,
                due_at = %entry.next_due_at,
                "Repeating unhealthy notification."
            );
            if let Err(e) = self.dispatcher.notify(
                &entry.account,
                HealthStatus::Unhealthy,
                entry.last_known_balance,
                now,
            ) {
                tracing::error!(account_id = %entry.account.id, error = %e, "Reminder history not recorded.");
            }
            entry.next_due_at = add_saturating(now, entry.account.repeat_interval());
            fired += 1;
        }
        fired
    }

    /// Stops the tick. Tracked entries are kept but no reminder fires until a
    /// new account is added.
    pub fn stop(&mut self) {
        if self.ticker.take().is_some() {
            tracing::info!(tracked = self.entries.len(), "Repeat scheduler stopped.");
        }
    }

    fn ensure_ticking(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        tracing::debug!(period = ?self.tick_interval, "Repeat tick started.");
    }
}

fn add_saturating(at: DateTime<Utc>, delta: chrono::TimeDelta) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
