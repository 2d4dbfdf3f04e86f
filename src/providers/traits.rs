//! This module defines the interface of the balance feed.

use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// Custom error type for balance source operations.
#[derive(Error, Debug)]
pub enum BalanceSourceError {
    /// Error when parsing the source URL.
    #[error("Failed to parse balance source URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The request could not be completed.
    #[error("Request error: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// The source answered with a non-success status.
    #[error("Balance source responded with status {0}")]
    UnexpectedStatus(u16),

    /// The response body is not the expected JSON object.
    #[error("Invalid balance response: {0}")]
    InvalidResponse(String),

    /// The HTTP client could not be created.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] crate::http_client::HttpClientError),

    /// The channel to the monitor was closed.
    #[error("Channel closed")]
    ChannelClosed,
}

/// A source of account balances.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Fetches the current balance of the given accounts. Accounts the source
    /// knows nothing about are absent from the result.
    async fn fetch_balances(
        &self,
        account_ids: &[String],
    ) -> Result<HashMap<String, f64>, BalanceSourceError>;
}
