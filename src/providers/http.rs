//! Balance source backed by an HTTP endpoint.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

use super::traits::{BalanceSource, BalanceSourceError};
use crate::{config::HttpRetryConfig, http_client::build_http_client};

/// Polls `GET {url}?accounts=id1,id2` and expects a JSON object mapping each
/// account id to a number.
pub struct HttpBalanceSource {
    url: Url,
    client: Arc<ClientWithMiddleware>,
}

impl HttpBalanceSource {
    /// Creates a source for the given endpoint.
    pub fn new(url: &str, retry_policy: &HttpRetryConfig) -> Result<Self, BalanceSourceError> {
        let url = Url::parse(url)?;
        let client = Arc::new(build_http_client(retry_policy)?);
        Ok(Self::with_client(url, client))
    }

    /// Creates a source using an existing client.
    pub fn with_client(url: Url, client: Arc<ClientWithMiddleware>) -> Self {
        Self { url, client }
    }

    fn request_url(&self, account_ids: &[String]) -> Url {
        let accounts: Vec<_> = account_ids.iter().map(|id| urlencoding::encode(id)).collect();
        let mut url = self.url.clone();
        url.set_query(Some(&format!("accounts={}", accounts.join(","))));
        url
    }

    /// Keeps the numeric entries of the response and drops the rest.
    fn parse_balances(body: serde_json::Value) -> Result<HashMap<String, f64>, BalanceSourceError> {
        let serde_json::Value::Object(entries) = body else {
            return Err(BalanceSourceError::InvalidResponse(
                "expected a JSON object of balances".to_string(),
            ));
        };

        let mut balances = HashMap::with_capacity(entries.len());
        for (account_id, value) in entries {
            match value.as_f64() {
                Some(balance) => {
                    balances.insert(account_id, balance);
                }
                None => {
                    tracing::warn!(account_id = %account_id, %value, "Ignoring non-numeric balance.");
                }
            }
        }
        Ok(balances)
    }
}

#[async_trait]
impl BalanceSource for HttpBalanceSource {
    #[tracing::instrument(skip_all, fields(accounts = account_ids.len()), level = "debug")]
    async fn fetch_balances(
        &self,
        account_ids: &[String],
    ) -> Result<HashMap<String, f64>, BalanceSourceError> {
        let response = self.client.get(self.request_url(account_ids)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BalanceSourceError::UnexpectedStatus(status.as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BalanceSourceError::InvalidResponse(e.to_string()))?;
        let balances = Self::parse_balances(body)?;
        tracing::debug!(received = balances.len(), "Balances fetched.");
        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn source(url: &str) -> HttpBalanceSource {
        HttpBalanceSource::new(url, &HttpRetryConfig::default()).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = HttpBalanceSource::new("not a url", &HttpRetryConfig::default());
        assert!(matches!(result, Err(BalanceSourceError::UrlParse(_))));
    }

    #[test]
    fn test_request_url_lists_encoded_ids() {
        let source = source("http://localhost:8080/balances");
        let url = source.request_url(&["hot wallet".to_string(), "relayer".to_string()]);
        assert_eq!(url.as_str(), "http://localhost:8080/balances?accounts=hot%20wallet,relayer");
    }

    #[test]
    fn test_parse_balances_drops_non_numbers() {
        let balances = HttpBalanceSource::parse_balances(json!({
            "a": 12.5,
            "b": 3,
            "c": "7",
            "d": null
        }))
        .unwrap();

        assert_eq!(balances.len(), 2);
        assert_eq!(balances["a"], 12.5);
        assert_eq!(balances["b"], 3.0);
    }

    #[test]
    fn test_parse_balances_rejects_non_objects() {
        assert!(matches!(
            HttpBalanceSource::parse_balances(json!([1, 2])),
            Err(BalanceSourceError::InvalidResponse(_))
        ));
    }
}
