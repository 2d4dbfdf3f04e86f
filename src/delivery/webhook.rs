//! Webhook delivery.
//!
//! Sends each notification as a JSON document to a configured endpoint,
//! optionally signed with HMAC-SHA256.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{
    Method,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use sha2::Sha256;
use url::Url;

use super::{error::DeliveryError, traits::DeliverySink};
use crate::models::{HealthStatus, Notification, NotificationMessage};

/// HMAC SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// The JSON document posted to the webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    /// Rendered title.
    pub title: &'a str,
    /// Rendered body.
    pub body: &'a str,
    /// The account the notification is about.
    pub account_id: &'a str,
    /// Display name of the account.
    pub account_name: &'a str,
    /// The reported status.
    pub status: HealthStatus,
    /// The balance that produced the status.
    pub balance: f64,
    /// The account's threshold.
    pub threshold: f64,
    /// When the notification was produced, RFC 3339.
    pub created_at: String,
}

impl<'a> WebhookPayload<'a> {
    /// Builds the payload for a notification.
    pub fn new(notification: &'a Notification, message: &'a NotificationMessage) -> Self {
        Self {
            title: &message.title,
            body: &message.body,
            account_id: &notification.account_id,
            account_name: &notification.account_name,
            status: notification.status,
            balance: notification.balance,
            threshold: notification.threshold,
            created_at: notification.created_at.to_rfc3339(),
        }
    }
}

/// Delivers notifications to an HTTP endpoint.
#[derive(Debug)]
pub struct WebhookSink {
    url: Url,
    method: Method,
    secret: Option<String>,
    headers: HeaderMap,
    client: Arc<ClientWithMiddleware>,
}

impl WebhookSink {
    /// Creates a new sink. The method, secret and headers are validated here
    /// so a bad configuration fails at startup rather than on the first
    /// alert.
    pub fn new(
        url: Url,
        method: Option<&str>,
        secret: Option<String>,
        headers: &HashMap<String, String>,
        client: Arc<ClientWithMiddleware>,
    ) -> Result<Self, DeliveryError> {
        let method = match method {
            Some(m) => Method::from_bytes(m.to_uppercase().as_bytes())
                .map_err(|e| DeliveryError::ConfigError(format!("Invalid method {m}: {e}")))?,
            None => Method::POST,
        };

        // An empty secret would silently produce a meaningless signature.
        if secret.as_deref().is_some_and(str::is_empty) {
            return Err(DeliveryError::ConfigError("Invalid secret: cannot be empty.".into()));
        }

        let mut header_map = HeaderMap::new();
        header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                DeliveryError::ConfigError(format!("Invalid header name: {key}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                DeliveryError::ConfigError(format!("Invalid header value for {key}: {e}"))
            })?;
            header_map.insert(name, value);
        }

        Ok(Self { url, method, secret, headers: header_map, client })
    }

    /// Computes the hex encoded HMAC-SHA256 of `body` followed by
    /// `timestamp`.
    pub fn sign_payload(
        secret: &str,
        body: &[u8],
        timestamp: &str,
    ) -> Result<String, DeliveryError> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| DeliveryError::ConfigError(format!("Invalid secret: {e}")))?;
        mac.update(body);
        mac.update(timestamp.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl DeliverySink for WebhookSink {
    #[tracing::instrument(skip_all, fields(account_id = %notification.account_id, url = %self.url))]
    async fn deliver(
        &self,
        notification: &Notification,
        message: &NotificationMessage,
    ) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(&WebhookPayload::new(notification, message))?;

        let mut headers = self.headers.clone();
        if let Some(secret) = &self.secret {
            let timestamp = Utc::now().timestamp_millis().to_string();
            let signature = Self::sign_payload(secret, &body, &timestamp)?;
            headers.insert(
                HeaderName::from_static("x-signature"),
                HeaderValue::from_str(&signature).map_err(|e| {
                    DeliveryError::DeliveryFailed(format!("Invalid signature value: {e}"))
                })?,
            );
            headers.insert(
                HeaderName::from_static("x-timestamp"),
                HeaderValue::from_str(&timestamp).map_err(|e| {
                    DeliveryError::DeliveryFailed(format!("Invalid timestamp value: {e}"))
                })?,
            );
        }

        let response = self
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::DeliveryFailed(format!(
                "Webhook request failed with status: {status}"
            )));
        }

        tracing::debug!(%status, "Webhook delivered.");
        Ok(())
    }
}
