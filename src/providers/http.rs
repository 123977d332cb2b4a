use crate::core::currency::ProviderParams;
use crate::core::error::{RateError, RateResult};
use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Upper bound for a single rate request, connect to last byte.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// GET-with-query client that decodes JSON bodies.
#[derive(Clone)]
pub struct JsonClient {
    client: Client,
    timeout: Duration,
}

impl JsonClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("ratewatch/1.0")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(JsonClient { client, timeout })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        provider: &'static str,
        url: &str,
        query: &[(&str, &str)],
    ) -> RateResult<T> {
        let url = Url::parse_with_params(url, query)
            .map_err(|e| RateError::remote(provider, format!("Invalid URL {url}: {e}")))?;
        debug!("Requesting rate from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RateError::remote(
                        provider,
                        format!("Request timed out after {:?}", self.timeout),
                    )
                } else {
                    RateError::remote(provider, format!("Request error: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::remote(provider, format!("HTTP error: {status}")));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                RateError::remote(
                    provider,
                    format!("Request timed out after {:?}", self.timeout),
                )
            } else {
                RateError::remote(provider, format!("Failed to read response body: {e}"))
            }
        })?;
        debug!(body = %text, "Received response");

        serde_json::from_str(&text)
            .map_err(|e| RateError::malformed(provider, format!("Failed to parse JSON response: {e}")))
    }
}

/// Fixed provider parameters followed by caller parameters. A caller
/// parameter never replaces a fixed one.
pub fn query_with_params<'a>(
    fixed: &[(&'a str, &'a str)],
    params: &'a ProviderParams,
) -> Vec<(&'a str, &'a str)> {
    let mut query = fixed.to_vec();
    query.extend(
        params
            .iter()
            .filter(|(key, _)| !fixed.iter().any(|(fixed_key, _)| *fixed_key == key.as_str()))
            .map(|(key, value)| (key.as_str(), value.as_str())),
    );
    query
}
