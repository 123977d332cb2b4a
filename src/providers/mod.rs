pub mod appspot;
pub mod currency_converter;
pub mod http;
pub mod open_exchange_rates;
pub mod util;
pub mod yahoo_yql;

use crate::core::currency::{ProviderRequest, QuoteSource, RateProvider, RateQuote};
use crate::core::error::{RateError, RateResult};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use appspot::AppspotProvider;
use currency_converter::CurrencyConverterProvider;
use http::{DEFAULT_TIMEOUT, JsonClient};
use open_exchange_rates::OpenExchangeRatesProvider;
use yahoo_yql::YqlCurrencyProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    LegacyAppspot,
    CurrencyConverter,
    YahooYql,
    OpenExchangeRates,
}

enum Matcher {
    Exact(&'static str),
    Contains(&'static [&'static str]),
}

impl Matcher {
    fn matches(&self, service: &str) -> bool {
        match self {
            Matcher::Exact(name) => service == *name,
            Matcher::Contains(needles) => needles.iter().any(|needle| service.contains(*needle)),
        }
    }
}

struct ProviderRoute {
    matcher: Matcher,
    kind: ProviderKind,
}

// Service identifiers are matched loosely, so the order here decides overlaps:
// "yql-openexchangerates" selects YQL.
const PROVIDER_ROUTES: &[ProviderRoute] = &[
    ProviderRoute {
        matcher: Matcher::Exact("rate-exchange.appspot.com"),
        kind: ProviderKind::LegacyAppspot,
    },
    ProviderRoute {
        matcher: Matcher::Contains(&["currencyconverterapi"]),
        kind: ProviderKind::CurrencyConverter,
    },
    ProviderRoute {
        matcher: Matcher::Contains(&["yahoo", "yql"]),
        kind: ProviderKind::YahooYql,
    },
    ProviderRoute {
        matcher: Matcher::Contains(&["openexchangerates"]),
        kind: ProviderKind::OpenExchangeRates,
    },
];

impl ProviderKind {
    /// First route whose matcher accepts `service`.
    pub fn match_service(service: &str) -> Option<Self> {
        PROVIDER_ROUTES
            .iter()
            .find(|route| route.matcher.matches(service))
            .map(|route| route.kind)
    }
}

/// Request URLs for each provider family.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub appspot: String,
    pub currency_converter: String,
    pub yahoo: String,
    pub open_exchange_rates: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        ProviderEndpoints {
            appspot: appspot::DEFAULT_URL.to_string(),
            currency_converter: currency_converter::DEFAULT_URL.to_string(),
            yahoo: yahoo_yql::DEFAULT_URL.to_string(),
            open_exchange_rates: open_exchange_rates::DEFAULT_URL.to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Every provider on one host, keeping the public paths.
    pub fn rooted_at(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        ProviderEndpoints {
            appspot: format!("{base}/currency"),
            currency_converter: format!("{base}/api/v3/convert"),
            yahoo: format!("{base}/v1/public/yql"),
            open_exchange_rates: format!("{base}/api/latest.json"),
        }
    }
}

/// Selects the provider for a request and scales its rate by the amount.
pub struct ProviderResolver {
    appspot: AppspotProvider,
    currency_converter: CurrencyConverterProvider,
    yahoo: YqlCurrencyProvider,
    open_exchange_rates: OpenExchangeRatesProvider,
}

impl ProviderResolver {
    pub fn new(endpoints: &ProviderEndpoints) -> Result<Self> {
        Self::with_timeout(endpoints, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoints: &ProviderEndpoints, timeout: Duration) -> Result<Self> {
        let http = JsonClient::new(timeout)?;
        Ok(ProviderResolver {
            appspot: AppspotProvider::new(&endpoints.appspot, http.clone()),
            currency_converter: CurrencyConverterProvider::new(
                &endpoints.currency_converter,
                http.clone(),
            ),
            yahoo: YqlCurrencyProvider::new(&endpoints.yahoo, http.clone()),
            open_exchange_rates: OpenExchangeRatesProvider::new(
                &endpoints.open_exchange_rates,
                http,
            ),
        })
    }

    fn provider(&self, kind: ProviderKind) -> &dyn RateProvider {
        match kind {
            ProviderKind::LegacyAppspot => &self.appspot,
            ProviderKind::CurrencyConverter => &self.currency_converter,
            ProviderKind::YahooYql => &self.yahoo,
            ProviderKind::OpenExchangeRates => &self.open_exchange_rates,
        }
    }
}

#[async_trait]
impl QuoteSource for ProviderResolver {
    async fn resolve(&self, request: &ProviderRequest) -> RateResult<RateQuote> {
        let kind = ProviderKind::match_service(&request.service).ok_or_else(|| {
            RateError::UnsupportedProvider {
                service: request.service.clone(),
            }
        })?;
        let provider = self.provider(kind);
        debug!(
            service = %request.service,
            provider = provider.name(),
            pair = %request.pair,
            "Resolving rate"
        );

        let rate = provider.fetch_rate(&request.pair, &request.params).await?;
        if !rate.is_finite() || rate < 0.0 {
            return Err(RateError::malformed(
                provider.name(),
                format!("Rate for {} must be a finite non-negative number, got {rate}", request.pair),
            ));
        }
        Ok(RateQuote::new(rate * request.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{CurrencyPair, ProviderParams};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_service_matching() {
        let cases = [
            ("rate-exchange.appspot.com", Some(ProviderKind::LegacyAppspot)),
            ("http://rate-exchange.appspot.com", None),
            ("currencyconverterapi", Some(ProviderKind::CurrencyConverter)),
            ("free.currencyconverterapi.com", Some(ProviderKind::CurrencyConverter)),
            ("yahoo", Some(ProviderKind::YahooYql)),
            ("yql", Some(ProviderKind::YahooYql)),
            ("query.yahooapis.com", Some(ProviderKind::YahooYql)),
            ("openexchangerates", Some(ProviderKind::OpenExchangeRates)),
            ("openexchangerates.org", Some(ProviderKind::OpenExchangeRates)),
            ("OpenExchangeRates", None),
            ("ecb", None),
            ("", None),
        ];
        for (service, expected) in cases {
            assert_eq!(ProviderKind::match_service(service), expected, "{service}");
        }
    }

    #[test]
    fn test_overlapping_identifiers_follow_route_order() {
        assert_eq!(
            ProviderKind::match_service("yql-openexchangerates"),
            Some(ProviderKind::YahooYql)
        );
        assert_eq!(
            ProviderKind::match_service("openexchangerates-via-yql"),
            Some(ProviderKind::YahooYql)
        );
        assert_eq!(
            ProviderKind::match_service("currencyconverterapi-yahoo"),
            Some(ProviderKind::CurrencyConverter)
        );
    }

    #[test]
    fn test_rooted_at_trims_trailing_slash() {
        let endpoints = ProviderEndpoints::rooted_at("http://127.0.0.1:8080/");
        assert_eq!(endpoints.appspot, "http://127.0.0.1:8080/currency");
        assert_eq!(endpoints.open_exchange_rates, "http://127.0.0.1:8080/api/latest.json");
    }

    #[tokio::test]
    async fn test_unsupported_provider() {
        let resolver = ProviderResolver::new(&ProviderEndpoints::default()).unwrap();
        let request = ProviderRequest::new("ecb", CurrencyPair::new("USD", "DKK"));
        let result = resolver.resolve(&request).await;
        assert_eq!(result.unwrap_err().to_string(), "Unsupported provider: ecb");
    }

    #[tokio::test]
    async fn test_quote_scales_linearly_with_amount() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/convert"))
            .and(query_param("q", "USD_DKK"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"USD_DKK":{"val":6.5}}"#))
            .mount(&mock_server)
            .await;

        let resolver =
            ProviderResolver::new(&ProviderEndpoints::rooted_at(&mock_server.uri())).unwrap();
        let pair = CurrencyPair::new("USD", "DKK");

        let unit = resolver
            .resolve(&ProviderRequest::new("currencyconverterapi", pair.clone()))
            .await
            .unwrap();
        let two = resolver
            .resolve(&ProviderRequest::new("currencyconverterapi", pair.clone()).with_amount(2.0))
            .await
            .unwrap();
        let six = resolver
            .resolve(&ProviderRequest::new("currencyconverterapi", pair).with_amount(6.0))
            .await
            .unwrap();

        assert_eq!(unit.value(), 6.5);
        assert_eq!(two.value(), 13.0);
        assert_eq!(six.value(), 3.0 * two.value());
    }

    async fn resolve_converter_body(body: &str) -> RateResult<RateQuote> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/convert"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let resolver =
            ProviderResolver::new(&ProviderEndpoints::rooted_at(&mock_server.uri())).unwrap();
        let request = ProviderRequest::new("currencyconverterapi", CurrencyPair::new("USD", "DKK"))
            .with_amount(2.0);
        resolver.resolve(&request).await
    }

    #[tokio::test]
    async fn test_non_numeric_rate_is_malformed() {
        let result = resolve_converter_body(r#"{"USD_DKK":{"val":"N/A"}}"#).await;
        assert!(matches!(
            result,
            Err(RateError::MalformedResponse { provider: "currencyconverterapi", .. })
        ));
    }

    #[tokio::test]
    async fn test_non_finite_rate_is_malformed() {
        for body in [
            r#"{"USD_DKK":{"val":"NaN"}}"#,
            r#"{"USD_DKK":{"val":"inf"}}"#,
            r#"{"USD_DKK":{"val":1e999}}"#,
        ] {
            let result = resolve_converter_body(body).await;
            assert!(
                matches!(result, Err(RateError::MalformedResponse { .. })),
                "{body}: {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_negative_rate_is_malformed() {
        let result = resolve_converter_body(r#"{"USD_DKK":{"val":-6.5}}"#).await;
        let err = result.unwrap_err();
        assert!(matches!(err, RateError::MalformedResponse { .. }));
        assert!(err.to_string().contains("got -6.5"), "{err}");
    }

    #[tokio::test]
    async fn test_zero_rate_is_accepted() {
        let quote = resolve_converter_body(r#"{"USD_DKK":{"val":0}}"#).await.unwrap();
        assert_eq!(quote.value(), 0.0);
    }

    #[tokio::test]
    async fn test_open_exchange_rates_cross_rate_with_amount() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/latest.json"))
            .and(query_param("app_id", "x"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"base": "USD", "rates": {"USD": 1.0, "SEK": 8.5, "DKK": 6.5}}"#,
            ))
            .mount(&mock_server)
            .await;

        let resolver =
            ProviderResolver::new(&ProviderEndpoints::rooted_at(&mock_server.uri())).unwrap();
        let request = ProviderRequest::new("openexchangerates", CurrencyPair::new("SEK", "DKK"))
            .with_amount(100.0)
            .with_params(ProviderParams::from([(
                "app_id".to_string(),
                "x".to_string(),
            )]));

        let quote = resolver.resolve(&request).await.unwrap();
        assert_eq!(quote.value(), (6.5 / 8.5) * 100.0);
    }

    #[tokio::test]
    async fn test_legacy_appspot_route() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/currency"))
            .and(query_param("from", "USD"))
            .and(query_param("to", "EUR"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"rate": 0.5}"#))
            .mount(&mock_server)
            .await;

        let resolver =
            ProviderResolver::new(&ProviderEndpoints::rooted_at(&mock_server.uri())).unwrap();
        let request =
            ProviderRequest::new("rate-exchange.appspot.com", CurrencyPair::new("USD", "EUR"))
                .with_amount(4.0);
        assert_eq!(resolver.resolve(&request).await.unwrap().value(), 2.0);
    }
}
