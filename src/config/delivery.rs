use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use super::HttpRetryConfig;

/// Where notifications are delivered.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryConfig {
    /// Print notifications to standard output.
    #[default]
    Stdout,

    /// Send notifications to an HTTP endpoint as JSON.
    Webhook {
        /// The endpoint to call.
        url: Url,
        /// HTTP method, `POST` when unset.
        #[serde(default)]
        method: Option<String>,
        /// Secret used to sign requests with HMAC-SHA256.
        #[serde(default)]
        secret: Option<String>,
        /// Extra headers sent with every request.
        #[serde(default)]
        headers: HashMap<String, String>,
        /// Retry policy for failed requests.
        #[serde(default)]
        retry_policy: HttpRetryConfig,
    },
}
