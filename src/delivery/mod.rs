//! Notification delivery channels.

use std::sync::Arc;

pub mod error;
pub mod stdout;
pub mod traits;
pub mod webhook;

pub use error::DeliveryError;
pub use stdout::StdoutSink;
pub use traits::DeliverySink;
pub use webhook::WebhookSink;

use crate::{config::DeliveryConfig, http_client::build_http_client};

/// Creates the sink described by the configuration.
pub fn create_sink(config: &DeliveryConfig) -> Result<Arc<dyn DeliverySink>, DeliveryError> {
    match config {
        DeliveryConfig::Stdout => {
            tracing::info!("Delivering notifications to stdout.");
            Ok(Arc::new(StdoutSink::new()))
        }
        DeliveryConfig::Webhook { url, method, secret, headers, retry_policy } => {
            let client = Arc::new(build_http_client(retry_policy)?);
            let sink =
                WebhookSink::new(url.clone(), method.as_deref(), secret.clone(), headers, client)?;
            tracing::info!(url = %url, "Delivering notifications to webhook.");
            Ok(Arc::new(sink))
        }
    }
}
