//! The Supervisor module manages the lifecycle of the balance sentinel.
//!
//! The `SupervisorBuilder` performs startup recovery and wires the services
//! together. The `Supervisor` then runs them:
//!
//! - the state writer draining the write-behind queue,
//! - the balance poller, when a balance source is configured,
//! - the balance monitor, which owns all alerting state,
//! - a signal handler for `SIGINT` and `SIGTERM`.
//!
//! When any of these ends, or a signal arrives, every service is cancelled.
//! Pending writes are then drained within the configured shutdown timeout.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::{
    signal,
    sync::mpsc,
    task::{JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::BalanceMonitor,
    models::BalanceSnapshot,
    persistence::{SqliteStateRepository, StateWriterTask, error::PersistenceError},
    providers::{BalancePoller, BalanceSource},
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// No accounts were provided to the `SupervisorBuilder`.
    #[error("Missing accounts for Supervisor")]
    MissingAccounts,

    /// A state repository was not provided to the `SupervisorBuilder`.
    #[error("Missing state repository for Supervisor")]
    MissingStateRepository,

    /// A delivery sink was not provided to the `SupervisorBuilder`.
    #[error("Missing delivery sink for Supervisor")]
    MissingDeliverySink,

    /// The stored account statuses could not be loaded at startup.
    #[error("Failed to load account statuses: {0}")]
    StatusLoadError(#[from] PersistenceError),
}

/// The primary runtime manager for the application.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The durable state backing the status store and the history.
    repository: Arc<SqliteStateRepository>,

    /// The accounts polled from the balance source.
    account_ids: Vec<String>,

    /// The balance feed, if the supervisor should poll one.
    balance_source: Option<Arc<dyn BalanceSource>>,

    /// The monitor, handed to its task by `run`.
    monitor: BalanceMonitor,

    /// The task draining the write-behind queue.
    writer_task: StateWriterTask,

    /// Sender side of the snapshot channel.
    snapshots_tx: mpsc::Sender<BalanceSnapshot>,

    /// Receiver side of the snapshot channel, consumed by the monitor.
    snapshots_rx: mpsc::Receiver<BalanceSnapshot>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: JoinSet<()>,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    fn new(
        config: AppConfig,
        repository: Arc<SqliteStateRepository>,
        account_ids: Vec<String>,
        balance_source: Option<Arc<dyn BalanceSource>>,
        monitor: BalanceMonitor,
        writer_task: StateWriterTask,
        snapshots_tx: mpsc::Sender<BalanceSnapshot>,
        snapshots_rx: mpsc::Receiver<BalanceSnapshot>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            repository,
            account_ids,
            balance_source,
            monitor,
            writer_task,
            snapshots_tx,
            snapshots_rx,
            cancellation_token: CancellationToken::new(),
            join_set: JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// The token cancelling every supervised task.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// A sender for pushing snapshots to the monitor directly, for embedders
    /// that do not use a balance source. The monitor stops once every sender
    /// is dropped.
    pub fn snapshot_sender(&self) -> mpsc::Sender<BalanceSnapshot> {
        self.snapshots_tx.clone()
    }

    /// Starts all services and runs until shutdown.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let signal_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            wait_for_shutdown_signal().await;
            signal_token.cancel();
        });

        let writer_handle: JoinHandle<()> = tokio::spawn(self.writer_task.run());

        match self.balance_source.take() {
            Some(source) => {
                let polling_interval = self
                    .config
                    .balance_source
                    .as_ref()
                    .map(|s| s.polling_interval_ms)
                    .unwrap_or(std::time::Duration::from_secs(6));
                let poller = BalancePoller::new(
                    source,
                    self.account_ids.clone(),
                    polling_interval,
                    self.snapshots_tx.clone(),
                    self.cancellation_token.clone(),
                );
                self.join_set.spawn(poller.run());
            }
            None => {
                tracing::info!("No balance source configured, waiting for pushed snapshots.");
            }
        }
        // Only the poller and external senders keep the channel open.
        drop(self.snapshots_tx);

        let monitor_token = self.cancellation_token.clone();
        let monitor = self.monitor;
        let snapshots_rx = self.snapshots_rx;
        self.join_set.spawn(async move {
            monitor.run(snapshots_rx, monitor_token.clone()).await;
            monitor_token.cancel();
        });

        tracing::info!(accounts = self.account_ids.len(), "Supervisor started.");

        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(())) => {}
                        Some(Err(e)) => {
                            tracing::error!(error = ?e, "A critical task failed. Initiating shutdown.");
                            self.cancellation_token.cancel();
                        }
                        None => break,
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        self.join_set.shutdown().await;
        tracing::info!("All supervised tasks have completed.");

        let shutdown_timeout = self.config.shutdown_timeout_secs;
        let repository = Arc::clone(&self.repository);
        let cleanup_logic = async move {
            if let Err(e) = writer_handle.await {
                tracing::error!(error = ?e, "State writer task failed.");
            }
            if let Err(e) = repository.cleanup().await {
                tracing::error!(error = %e, "Failed to perform state repository cleanup, but continuing.");
            }
        };

        if tokio::time::timeout(shutdown_timeout, cleanup_logic).await.is_err() {
            tracing::warn!(
                timeout = ?shutdown_timeout,
                "Pending writes did not drain within the shutdown timeout. Continuing shutdown."
            );
        } else {
            tracing::info!("Pending writes drained.");
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = signal::ctrl_c();
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
        _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
    }
}
