//! Integration tests for the delivery sinks

use std::{collections::HashMap, sync::Arc};

use balance_sentinel::{
    config::{DeliveryConfig, HttpRetryConfig},
    delivery::{DeliveryError, DeliverySink, WebhookSink, create_sink},
    http_client::build_http_client,
    models::{Account, HealthStatus, Notification},
};
use chrono::DateTime;
use mockito::Matcher;
use serde_json::json;
use url::Url;

fn notification(status: HealthStatus, balance: f64) -> Notification {
    let account = Account::new("acc-1", "Relayer", 10.0, 3600);
    let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    Notification::new(&account, status, balance, at)
}

fn no_retries() -> HttpRetryConfig {
    HttpRetryConfig { max_retries: 0, ..Default::default() }
}

fn webhook(
    server: &mockito::Server,
    secret: Option<&str>,
    headers: HashMap<String, String>,
) -> WebhookSink {
    let url = Url::parse(&format!("{}/hook", server.url())).unwrap();
    let client = Arc::new(build_http_client(&no_retries()).unwrap());
    WebhookSink::new(url, None, secret.map(str::to_string), &headers, client).unwrap()
}

#[tokio::test]
async fn test_webhook_posts_json_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .match_header("content-type", "application/json")
        .match_header("x-team", "treasury")
        .match_body(Matcher::PartialJson(json!({
            "title": "Low balance: Relayer",
            "body": "Account Relayer has a low balance of 9.000, threshold of 10",
            "account_id": "acc-1",
            "account_name": "Relayer",
            "status": "unhealthy",
            "balance": 9.0,
            "threshold": 10.0
        })))
        .with_status(200)
        .create_async()
        .await;

    let sink = webhook(&server, None, HashMap::from([("X-Team".into(), "treasury".into())]));
    let notification = notification(HealthStatus::Unhealthy, 9.0);
    let result = sink.deliver(&notification, &notification.render()).await;

    assert!(result.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_webhook_signs_payload_when_secret_is_set() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .match_header("x-signature", Matcher::Regex("^[0-9a-f]{64}$".to_string()))
        .match_header("x-timestamp", Matcher::Regex("^[0-9]+$".to_string()))
        .with_status(204)
        .create_async()
        .await;

    let sink = webhook(&server, Some("top-secret"), HashMap::new());
    let notification = notification(HealthStatus::Approaching, 10.5);
    let result = sink.deliver(&notification, &notification.render()).await;

    assert!(result.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_webhook_without_secret_sends_no_signature() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .match_header("x-signature", Matcher::Missing)
        .with_status(200)
        .create_async()
        .await;

    let sink = webhook(&server, None, HashMap::new());
    let notification = notification(HealthStatus::Resolved, 12.0);
    sink.deliver(&notification, &notification.render()).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_webhook_non_success_status_is_a_failure() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/hook").with_status(400).create_async().await;

    let sink = webhook(&server, None, HashMap::new());
    let notification = notification(HealthStatus::Unhealthy, 9.0);
    let result = sink.deliver(&notification, &notification.render()).await;

    assert!(matches!(result, Err(DeliveryError::DeliveryFailed(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_sink_created_from_config_uses_configured_method() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("PUT", "/alerts").with_status(200).create_async().await;

    let config = DeliveryConfig::Webhook {
        url: Url::parse(&format!("{}/alerts", server.url())).unwrap(),
        method: Some("put".to_string()),
        secret: None,
        headers: HashMap::new(),
        retry_policy: no_retries(),
    };
    let sink = create_sink(&config).unwrap();
    let notification = notification(HealthStatus::Unhealthy, 1.0);
    sink.deliver(&notification, &notification.render()).await.unwrap();

    mock.assert_async().await;
}
