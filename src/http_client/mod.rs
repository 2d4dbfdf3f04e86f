//! Retryable HTTP clients shared by the balance source and the webhook sink.

mod client;

pub use client::{HttpClientError, build_http_client, create_retryable_http_client};
