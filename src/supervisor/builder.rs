//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::mpsc;

use super::{Supervisor, SupervisorError};
use crate::{
    config::AppConfig,
    delivery::DeliverySink,
    engine::{AccountStatusStore, BalanceMonitor, NotificationDispatcher, RepeatScheduler},
    models::Account,
    persistence::{SqliteStateRepository, StateWriter, traits::NotificationRepository},
    providers::BalanceSource,
};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    accounts: Vec<Account>,
    repository: Option<Arc<SqliteStateRepository>>,
    balance_source: Option<Arc<dyn BalanceSource>>,
    sink: Option<Arc<dyn DeliverySink>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the monitored accounts.
    pub fn accounts(mut self, accounts: Vec<Account>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Sets the state repository (database connection) for the `Supervisor`.
    pub fn repository(mut self, repository: Arc<SqliteStateRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Sets the balance source polled by the `Supervisor`. Without one,
    /// snapshots must be pushed through [`Supervisor::snapshot_sender`].
    pub fn balance_source(mut self, balance_source: Arc<dyn BalanceSource>) -> Self {
        self.balance_source = Some(balance_source);
        self
    }

    /// Sets the delivery sink notifications are sent through.
    pub fn sink(mut self, sink: Arc<dyn DeliverySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Performs startup recovery and wires the services together.
    ///
    /// The notification history is read first to recover each account's last
    /// send time. A failure there is logged and recovery proceeds without it.
    /// The account statuses are loaded next. A failure there aborts startup,
    /// since every account would otherwise look like it changed status.
    pub async fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let repository = self.repository.ok_or(SupervisorError::MissingStateRepository)?;
        let sink = self.sink.ok_or(SupervisorError::MissingDeliverySink)?;
        if self.accounts.is_empty() {
            return Err(SupervisorError::MissingAccounts);
        }
        let account_ids: Vec<String> = self.accounts.iter().map(|a| a.id.clone()).collect();

        let last_sent = match repository.latest_per_account(&account_ids).await {
            Ok(last_sent) => last_sent,
            Err(e) => {
                tracing::error!(error = %e, "Failed to recover last notification times, continuing without them.");
                HashMap::new()
            }
        };

        let (writer, writer_task) = StateWriter::new(repository.clone(), repository.clone());

        let mut store = AccountStatusStore::new(repository.clone(), writer.clone());
        store.load(&account_ids).await?;

        let dispatcher = Arc::new(NotificationDispatcher::new(sink, writer));
        let mut scheduler =
            RepeatScheduler::new(Arc::clone(&dispatcher), config.repeat_check_interval_ms);
        scheduler.restore_last_notifications(last_sent);

        let monitor = BalanceMonitor::new(self.accounts, store, scheduler, dispatcher);
        let (snapshots_tx, snapshots_rx) = mpsc::channel(config.snapshot_channel_capacity.max(1));

        Ok(Supervisor::new(
            config,
            repository,
            account_ids,
            self.balance_source,
            monitor,
            writer_task,
            snapshots_tx,
            snapshots_rx,
        ))
    }
}
