//! currencyconverterapi.com provider, compact mode.

use super::http::{JsonClient, query_with_params};
use super::util::lenient_f64;
use crate::core::currency::{CurrencyPair, ProviderParams, RateProvider};
use crate::core::error::{RateError, RateResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;

pub const DEFAULT_URL: &str = "http://free.currencyconverterapi.com/api/v3/convert";

pub struct CurrencyConverterProvider {
    url: String,
    http: JsonClient,
}

impl CurrencyConverterProvider {
    pub fn new(url: &str, http: JsonClient) -> Self {
        CurrencyConverterProvider {
            url: url.to_string(),
            http,
        }
    }
}

// Compact responses are keyed by the query, e.g. {"USD_DKK": {"val": 6.5}}
#[derive(Debug, Deserialize)]
struct ConversionEntry {
    #[serde(deserialize_with = "lenient_f64")]
    val: f64,
}

#[async_trait]
impl RateProvider for CurrencyConverterProvider {
    fn name(&self) -> &'static str {
        "currencyconverterapi"
    }

    #[instrument(name = "CurrencyConverterRateFetch", skip(self, params), fields(pair = %pair))]
    async fn fetch_rate(&self, pair: &CurrencyPair, params: &ProviderParams) -> RateResult<f64> {
        let key = format!("{}_{}", pair.base(), pair.quote());
        let query = query_with_params(&[("q", key.as_str()), ("compact", "y")], params);

        let mut data: HashMap<String, ConversionEntry> =
            self.http.get_json(self.name(), &self.url, &query).await?;

        data.remove(&key)
            .map(|entry| entry.val)
            .ok_or_else(|| RateError::malformed(self.name(), format!("No entry for {key}")))
    }
}
