//! The monitor loop.
//!
//! Receives balance snapshots, classifies each balance, records the status,
//! notifies on transitions and keeps the repeat scheduler in sync. The loop
//! is the only place that mutates the status mirror and the scheduler, so
//! snapshots and reminder ticks never interleave.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{
    classifier::classify, dispatcher::NotificationDispatcher, repeat_scheduler::RepeatScheduler,
    status_store::AccountStatusStore,
};
use crate::models::{Account, BalanceSnapshot, HealthStatus};

/// What woke the loop up.
enum MonitorEvent {
    Shutdown,
    Snapshot(Option<BalanceSnapshot>),
    Tick,
}

/// Owns the alerting state and applies balance samples to it.
pub struct BalanceMonitor {
    accounts: HashMap<String, Account>,
    store: AccountStatusStore,
    scheduler: RepeatScheduler,
    dispatcher: Arc<NotificationDispatcher>,
}

impl BalanceMonitor {
    /// Creates a monitor for the given accounts. The store must already be
    /// loaded and the scheduler seeded with the recovered notification
    /// times.
    pub fn new(
        accounts: Vec<Account>,
        store: AccountStatusStore,
        scheduler: RepeatScheduler,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        let accounts = accounts.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self { accounts, store, scheduler, dispatcher }
    }

    /// Applies every balance of a snapshot. Unknown accounts and non-finite
    /// balances are skipped.
    pub fn process_snapshot(&mut self, snapshot: &BalanceSnapshot, now: DateTime<Utc>) {
        tracing::debug!(count = snapshot.balances.len(), "Processing balance snapshot.");
        for (account_id, balance) in &snapshot.balances {
            let Some(account) = self.accounts.get(account_id).cloned() else {
                tracing::warn!(account_id = %account_id, "Balance received for unknown account, skipping.");
                continue;
            };
            if !balance.is_finite() {
                tracing::warn!(account_id = %account_id, balance, "Non-finite balance, skipping.");
                continue;
            }
            self.check_account(&account, *balance, now);
        }
    }

    /// Applies a single balance sample. Returns the resulting status.
    pub fn check_account(
        &mut self,
        account: &Account,
        balance: f64,
        now: DateTime<Utc>,
    ) -> HealthStatus {
        let status = classify(balance, account.threshold);
        let observation = self.store.observe(&account.id, status, now);

        if observation.changed() {
            tracing::info!(
                account_id = %account.id,
                previous = %observation.previous.unwrap_or_default(),
                status = %status,
                balance,
                "Account status changed."
            );
            if let Err(e) = self.dispatcher.notify(account, status, balance, now) {
                tracing::error!(account_id = %account.id, error = %e, "Notification history not recorded.");
            }
        } else {
            tracing::debug!(account_id = %account.id, status = %status, balance, "Account status unchanged.");
        }

        if status == HealthStatus::Unhealthy {
            self.scheduler.add_account(account, balance, now);
        } else {
            self.scheduler.remove_account(&account.id);
        }

        status
    }

    /// Sends reminders that are due at `now`.
    pub fn fire_due(&mut self, now: DateTime<Utc>) -> usize {
        self.scheduler.fire_due(now)
    }

    /// The mirrored status of an account.
    pub fn status(&self, account_id: &str) -> Option<HealthStatus> {
        self.store.status(account_id)
    }

    /// Read access to the repeat scheduler.
    pub fn scheduler(&self) -> &RepeatScheduler {
        &self.scheduler
    }

    /// The dispatcher notifications go through.
    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    /// Runs until cancelled or until the snapshot channel closes.
    pub async fn run(
        mut self,
        mut snapshots: mpsc::Receiver<BalanceSnapshot>,
        cancellation_token: CancellationToken,
    ) {
        tracing::info!(accounts = self.accounts.len(), "Balance monitor started.");
        loop {
            let event = tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => MonitorEvent::Shutdown,
                snapshot = snapshots.recv() => MonitorEvent::Snapshot(snapshot),
                _ = self.scheduler.next_tick() => MonitorEvent::Tick,
            };

            match event {
                MonitorEvent::Shutdown => {
                    tracing::info!("Balance monitor received shutdown signal.");
                    break;
                }
                MonitorEvent::Snapshot(Some(snapshot)) => {
                    self.process_snapshot(&snapshot, Utc::now());
                }
                MonitorEvent::Snapshot(None) => {
                    tracing::warn!("Balance snapshot channel closed.");
                    break;
                }
                MonitorEvent::Tick => {
                    let fired = self.fire_due(Utc::now());
                    if fired > 0 {
                        tracing::debug!(fired, "Repeat tick sent reminders.");
                    }
                }
            }
        }
        self.scheduler.stop();
        tracing::info!("Balance monitor has shut down.");
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use chrono::TimeDelta;

    use super::*;
    use crate::{
        delivery::traits::MockDeliverySink,
        models::{Notification, StatusRecord},
        persistence::{
            StateWriter,
            traits::{MockAccountStatusRepository, MockNotificationRepository},
        },
    };

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    struct Harness {
        monitor: BalanceMonitor,
        delivered: Arc<Mutex<Vec<Notification>>>,
    }

    impl Harness {
        async fn new(accounts: Vec<Account>, existing: Vec<StatusRecord>) -> Self {
            let delivered = Arc::new(Mutex::new(Vec::new()));
            let recorded = delivered.clone();
            let mut sink = MockDeliverySink::new();
            sink.expect_deliver().returning(move |n, _| {
                recorded.lock().unwrap().push(n.clone());
                Ok(())
            });

            let mut status_repo = MockAccountStatusRepository::new();
            status_repo.expect_get_many().returning(move |_| Ok(existing.clone()));
            status_repo.expect_insert().returning(|_| Ok(()));
            status_repo.expect_update().returning(|_, _, _| Ok(()));
            let mut history = MockNotificationRepository::new();
            history.expect_insert_notification().returning(|_| Ok(()));
            let status_repo = Arc::new(status_repo);

            let (writer, task) = StateWriter::new(status_repo.clone(), Arc::new(history));
            tokio::spawn(task.run());

            let ids: Vec<String> = accounts.iter().map(|a| a.id.clone()).collect();
            let mut store = AccountStatusStore::new(status_repo, writer.clone());
            store.load(&ids).await.unwrap();
            let dispatcher = Arc::new(NotificationDispatcher::new(Arc::new(sink), writer));
            let scheduler = RepeatScheduler::new(dispatcher.clone(), Duration::from_secs(5));

            Self { monitor: BalanceMonitor::new(accounts, store, scheduler, dispatcher), delivered }
        }

        async fn statuses_sent(&self) -> Vec<HealthStatus> {
            self.monitor.dispatcher().wait_for_deliveries().await;
            self.delivered.lock().unwrap().iter().map(|n| n.status).collect()
        }
    }

    #[tokio::test]
    async fn test_sample_sequence_notifies_each_transition_once() {
        let account = Account::new("acc", "Relayer", 10.0, 3600);
        let mut h = Harness::new(vec![account.clone()], vec![]).await;

        let statuses: Vec<HealthStatus> = [15.0, 10.5, 9.0, 12.0]
            .into_iter()
            .enumerate()
            .map(|(i, balance)| {
                h.monitor.check_account(&account, balance, t0() + TimeDelta::seconds(i as i64))
            })
            .collect();

        assert_eq!(
            statuses,
            vec![
                HealthStatus::Resolved,
                HealthStatus::Approaching,
                HealthStatus::Unhealthy,
                HealthStatus::Resolved
            ]
        );
        assert_eq!(
            h.statuses_sent().await,
            vec![HealthStatus::Approaching, HealthStatus::Unhealthy, HealthStatus::Resolved]
        );
    }

    #[tokio::test]
    async fn test_unhealthy_samples_track_and_untrack() {
        let account = Account::new("acc", "Relayer", 10.0, 60);
        let mut h = Harness::new(vec![account.clone()], vec![]).await;

        h.monitor.check_account(&account, 5.0, t0());
        assert!(h.monitor.scheduler().is_tracked("acc"));
        assert!(h.monitor.scheduler().is_running());

        h.monitor.check_account(&account, 4.0, t0() + TimeDelta::seconds(30));
        assert_eq!(
            h.monitor.scheduler().next_due("acc"),
            Some(t0() + TimeDelta::seconds(90))
        );

        h.monitor.check_account(&account, 10.6, t0() + TimeDelta::seconds(40));
        assert!(!h.monitor.scheduler().is_tracked("acc"));
        assert!(!h.monitor.scheduler().is_running());

        // Unhealthy then approaching: two transitions, no reminder.
        assert_eq!(
            h.statuses_sent().await,
            vec![HealthStatus::Unhealthy, HealthStatus::Approaching]
        );
    }

    #[tokio::test]
    async fn test_unhealthy_at_startup_is_not_renotified() {
        let account = Account::new("acc", "Relayer", 10.0, 60);
        let mut h = Harness::new(
            vec![account.clone()],
            vec![StatusRecord::new("acc", HealthStatus::Unhealthy, t0())],
        )
        .await;

        h.monitor.check_account(&account, 3.0, t0() + TimeDelta::seconds(1));
        assert!(h.monitor.scheduler().is_tracked("acc"));
        assert!(h.statuses_sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_skips_unknown_and_non_finite() {
        let account = Account::new("acc", "Relayer", 10.0, 60);
        let mut h = Harness::new(vec![account], vec![]).await;

        let snapshot = BalanceSnapshot {
            balances: HashMap::from([
                ("acc".to_string(), f64::NAN),
                ("ghost".to_string(), 1.0),
            ]),
            observed_at: t0(),
        };
        h.monitor.process_snapshot(&snapshot, t0());

        assert_eq!(h.monitor.status("acc"), None);
        assert_eq!(h.monitor.status("ghost"), None);
        assert!(h.statuses_sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_repeat_fires_through_monitor() {
        let account = Account::new("acc", "Relayer", 10.0, 60);
        let mut h = Harness::new(vec![account.clone()], vec![]).await;

        h.monitor.check_account(&account, 2.0, t0());
        assert_eq!(h.monitor.fire_due(t0() + TimeDelta::seconds(59)), 0);
        assert_eq!(h.monitor.fire_due(t0() + TimeDelta::seconds(60)), 1);

        assert_eq!(
            h.statuses_sent().await,
            vec![HealthStatus::Unhealthy, HealthStatus::Unhealthy]
        );
    }

    #[tokio::test]
    async fn test_run_processes_snapshots_until_cancelled() {
        let account = Account::new("acc", "Relayer", 10.0, 60);
        let h = Harness::new(vec![account], vec![]).await;
        let delivered = h.delivered.clone();
        let dispatcher = h.monitor.dispatcher().clone();

        let (tx, rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let handle = tokio::spawn(h.monitor.run(rx, token.clone()));

        tx.send(BalanceSnapshot::single("acc", 10.5)).await.unwrap();
        tx.send(BalanceSnapshot::single("acc", 10.4)).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                dispatcher.wait_for_deliveries().await;
                if !delivered.lock().unwrap().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        token.cancel();
        handle.await.unwrap();
        dispatcher.wait_for_deliveries().await;
        assert_eq!(delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_when_channel_closes() {
        let h = Harness::new(vec![Account::new("acc", "Relayer", 10.0, 60)], vec![]).await;
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), h.monitor.run(rx, CancellationToken::new()))
            .await
            .unwrap();
    }
}
