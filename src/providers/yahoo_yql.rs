use super::http::{JsonClient, query_with_params};
use super::util::lenient_f64;
use crate::core::currency::{CurrencyPair, ProviderParams, RateProvider};
use crate::core::error::{RateError, RateResult};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

pub const DEFAULT_URL: &str = "https://query.yahooapis.com/v1/public/yql";
const DATATABLES_ENV: &str = "store://datatables.org/alltableswithkeys";

// YqlCurrencyProvider queries the yahoo.finance.xchange table
pub struct YqlCurrencyProvider {
    url: String,
    http: JsonClient,
}

impl YqlCurrencyProvider {
    pub fn new(url: &str, http: JsonClient) -> Self {
        YqlCurrencyProvider {
            url: url.to_string(),
            http,
        }
    }

    fn query_for(pair: &CurrencyPair) -> String {
        format!(
            r#"select * from yahoo.finance.xchange where pair in ("{}{}")"#,
            pair.base(),
            pair.quote()
        )
    }
}

#[derive(Debug, Deserialize)]
struct YqlResponse {
    query: YqlQuery,
}

#[derive(Debug, Deserialize)]
struct YqlQuery {
    results: Option<YqlResults>,
}

#[derive(Debug, Deserialize)]
struct YqlResults {
    rate: YqlRate,
}

#[derive(Debug, Deserialize)]
struct YqlRate {
    #[serde(rename = "Rate", deserialize_with = "lenient_f64")]
    rate: f64,
}

#[async_trait]
impl RateProvider for YqlCurrencyProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    #[instrument(name = "YqlRateFetch", skip(self, params), fields(pair = %pair))]
    async fn fetch_rate(&self, pair: &CurrencyPair, params: &ProviderParams) -> RateResult<f64> {
        let yql = Self::query_for(pair);
        let query = query_with_params(
            &[("q", yql.as_str()), ("format", "json"), ("env", DATATABLES_ENV)],
            params,
        );

        let data: YqlResponse = self.http.get_json(self.name(), &self.url, &query).await?;
        let results = data.query.results.ok_or_else(|| {
            RateError::malformed(self.name(), format!("No results for currency pair: {pair}"))
        })?;
        Ok(results.rate.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::http::DEFAULT_TIMEOUT;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/public/yql"))
            .and(query_param(
                "q",
                r#"select * from yahoo.finance.xchange where pair in ("USDMXN")"#,
            ))
            .and(query_param("format", "json"))
            .and(query_param("env", DATATABLES_ENV))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(mock_server: &MockServer) -> YqlCurrencyProvider {
        YqlCurrencyProvider::new(
            &format!("{}/v1/public/yql", mock_server.uri()),
            JsonClient::new(DEFAULT_TIMEOUT).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{
            "query": {
                "count": 1,
                "results": {
                    "rate": {
                        "id": "USDMXN",
                        "Name": "USD/MXN",
                        "Rate": "18.4250",
                        "Ask": "18.4300",
                        "Bid": "18.4200"
                    }
                }
            }
        }"#;
        let mock_server = create_mock_server(mock_response).await;

        let rate = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("USD", "MXN"), &ProviderParams::new())
            .await
            .unwrap();
        assert_eq!(rate, 18.425);
    }

    #[tokio::test]
    async fn test_null_results() {
        let mock_server = create_mock_server(r#"{"query": {"count": 0, "results": null}}"#).await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("USD", "MXN"), &ProviderParams::new())
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Malformed response (yahoo): No results for currency pair: USD/MXN"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server(r#"{"query": {"results": {"rates": {}}}}"#).await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("USD", "MXN"), &ProviderParams::new())
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, RateError::MalformedResponse { .. }));
        assert!(err.to_string().contains("Failed to parse JSON response"));
    }
}
