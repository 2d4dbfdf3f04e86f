//! The BalancePoller periodically fetches balances from a `BalanceSource`
//! and feeds them to the monitor.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::traits::{BalanceSource, BalanceSourceError};
use crate::models::BalanceSnapshot;

/// Polls a balance source on a fixed interval.
pub struct BalancePoller<S: BalanceSource + ?Sized> {
    /// The source balances are read from.
    source: Arc<S>,
    /// The accounts to ask for.
    account_ids: Vec<String>,
    /// Time between two polls.
    polling_interval: Duration,
    /// The sender for the snapshot channel.
    snapshots_tx: mpsc::Sender<BalanceSnapshot>,
    /// A token used to signal a graceful shutdown.
    cancellation_token: CancellationToken,
}

impl<S: BalanceSource + ?Sized> BalancePoller<S> {
    /// Creates a new BalancePoller instance.
    pub fn new(
        source: Arc<S>,
        account_ids: Vec<String>,
        polling_interval: Duration,
        snapshots_tx: mpsc::Sender<BalanceSnapshot>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { source, account_ids, polling_interval, snapshots_tx, cancellation_token }
    }

    /// Starts the long-running polling loop.
    pub async fn run(self) {
        loop {
            let polling_delay = tokio::time::sleep(self.polling_interval);

            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("BalancePoller cancellation signal received, shutting down...");
                    break;
                }

                _ = polling_delay => {
                    match self.poll_once().await {
                        Ok(()) => {}
                        Err(BalanceSourceError::ChannelClosed) => {
                            tracing::warn!("Snapshot channel closed, stopping balance polling.");
                            break;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Error fetching balances. Retrying after delay...");
                        }
                    }
                }
            }
        }
        tracing::info!("BalancePoller has shut down.");
    }

    /// Performs one fetch and forwards the result.
    pub async fn poll_once(&self) -> Result<(), BalanceSourceError> {
        let balances = self.source.fetch_balances(&self.account_ids).await?;
        if balances.is_empty() {
            tracing::debug!("Balance source returned no balances.");
            return Ok(());
        }

        if self.snapshots_tx.send(BalanceSnapshot::new(balances)).await.is_err() {
            return Err(BalanceSourceError::ChannelClosed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use mockall::predicate::eq;

    use super::*;
    use crate::providers::traits::MockBalanceSource;

    fn ids() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[tokio::test]
    async fn test_poll_once_forwards_snapshot() {
        let mut source = MockBalanceSource::new();
        source
            .expect_fetch_balances()
            .with(eq(ids()))
            .times(1)
            .returning(|_| Ok(HashMap::from([("a".to_string(), 5.0)])));
        let (tx, mut rx) = mpsc::channel(4);
        let poller = BalancePoller::new(
            Arc::new(source),
            ids(),
            Duration::from_secs(1),
            tx,
            CancellationToken::new(),
        );

        poller.poll_once().await.unwrap();
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.balances, HashMap::from([("a".to_string(), 5.0)]));
    }

    #[tokio::test]
    async fn test_poll_once_skips_empty_results() {
        let mut source = MockBalanceSource::new();
        source.expect_fetch_balances().returning(|_| Ok(HashMap::new()));
        let (tx, mut rx) = mpsc::channel(4);
        let poller =
            BalancePoller::new(Arc::new(source), ids(), Duration::from_secs(1), tx, CancellationToken::new());

        poller.poll_once().await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_poll_once_reports_closed_channel() {
        let mut source = MockBalanceSource::new();
        source.expect_fetch_balances().returning(|_| Ok(HashMap::from([("a".to_string(), 1.0)])));
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let poller =
            BalancePoller::new(Arc::new(source), ids(), Duration::from_secs(1), tx, CancellationToken::new());

        assert!(matches!(poller.poll_once().await, Err(BalanceSourceError::ChannelClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_source_errors_and_stops_on_cancel() {
        let mut source = MockBalanceSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_fetch_balances()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BalanceSourceError::UnexpectedStatus(502)));
        source
            .expect_fetch_balances()
            .times(1..)
            .returning(|_| Ok(HashMap::from([("b".to_string(), 2.0)])));
        let (tx, mut rx) = mpsc::channel(16);
        let token = CancellationToken::new();
        let poller =
            BalancePoller::new(Arc::new(source), ids(), Duration::from_millis(100), tx, token.clone());
        let handle = tokio::spawn(poller.run());

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.balances["b"], 2.0);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_when_channel_closes() {
        let mut source = MockBalanceSource::new();
        source.expect_fetch_balances().returning(|_| Ok(HashMap::from([("a".to_string(), 1.0)])));
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let poller = BalancePoller::new(
            Arc::new(source),
            ids(),
            Duration::from_millis(1),
            tx,
            CancellationToken::new(),
        );

        tokio::time::timeout(Duration::from_secs(5), poller.run()).await.unwrap();
    }
}
