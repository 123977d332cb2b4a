//! Legacy rate-exchange.appspot.com provider.

use super::http::{JsonClient, query_with_params};
use super::util::lenient_f64;
use crate::core::currency::{CurrencyPair, ProviderParams, RateProvider};
use crate::core::error::RateResult;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

pub const DEFAULT_URL: &str = "http://rate-exchange.appspot.com/currency";

pub struct AppspotProvider {
    url: String,
    http: JsonClient,
}

impl AppspotProvider {
    pub fn new(url: &str, http: JsonClient) -> Self {
        AppspotProvider {
            url: url.to_string(),
            http,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppspotResponse {
    #[serde(deserialize_with = "lenient_f64")]
    rate: f64,
}

#[async_trait]
impl RateProvider for AppspotProvider {
    fn name(&self) -> &'static str {
        "rate-exchange.appspot.com"
    }

    #[instrument(name = "AppspotRateFetch", skip(self, params), fields(pair = %pair))]
    async fn fetch_rate(&self, pair: &CurrencyPair, params: &ProviderParams) -> RateResult<f64> {
        let query = query_with_params(&[("from", pair.base()), ("to", pair.quote())], params);
        let data: AppspotResponse = self.http.get_json(self.name(), &self.url, &query).await?;
        Ok(data.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RateError;
    use crate::providers::http::DEFAULT_TIMEOUT;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/currency"))
            .and(query_param("from", "USD"))
            .and(query_param("to", "EUR"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(mock_server: &MockServer) -> AppspotProvider {
        AppspotProvider::new(
            &format!("{}/currency", mock_server.uri()),
            JsonClient::new(DEFAULT_TIMEOUT).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_server =
            create_mock_server(r#"{"to": "EUR", "rate": 0.9214, "from": "USD"}"#).await;
        let rate = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("USD", "EUR"), &ProviderParams::new())
            .await
            .unwrap();
        assert_eq!(rate, 0.9214);
    }

    #[tokio::test]
    async fn test_missing_rate_field() {
        let mock_server = create_mock_server(r#"{"err": "failed to parse response"}"#).await;
        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("USD", "EUR"), &ProviderParams::new())
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, RateError::MalformedResponse { .. }));
        assert!(err.to_string().contains("missing field `rate`"));
    }
}
