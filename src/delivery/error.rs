//! Error types for notification delivery.

use thiserror::Error;

use crate::http_client::HttpClientError;

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The sink configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The receiving end rejected the notification.
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// The payload could not be serialized.
    #[error("Failed to serialize payload: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// An error originating from building the HTTP client.
    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] HttpClientError),

    /// An error from the underlying `reqwest` or `reqwest_middleware`
    /// libraries.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest_middleware::Error),
}
