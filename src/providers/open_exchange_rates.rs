//! openexchangerates.org provider.
//!
//! A single `latest.json` call returns every rate against the account's base
//! currency (always USD on free plans). Pairs not starting at the base are
//! derived as a cross-rate through it.

use super::http::{JsonClient, query_with_params};
use crate::core::currency::{CurrencyPair, ProviderParams, RateProvider};
use crate::core::error::{RateError, RateResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

pub const DEFAULT_URL: &str = "https://openexchangerates.org/api/latest.json";
const APP_ID: &str = "app_id";

pub struct OpenExchangeRatesProvider {
    url: String,
    http: JsonClient,
}

impl OpenExchangeRatesProvider {
    pub fn new(url: &str, http: JsonClient) -> Self {
        OpenExchangeRatesProvider {
            url: url.to_string(),
            http,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    base: String,
    rates: HashMap<String, f64>,
}

impl LatestResponse {
    fn rate(&self, provider: &'static str, code: &str) -> RateResult<f64> {
        self.rates
            .get(code)
            .copied()
            .ok_or_else(|| RateError::malformed(provider, format!("No rate for {code} in rates")))
    }

    fn rate_for(&self, provider: &'static str, pair: &CurrencyPair) -> RateResult<f64> {
        let quote_rate = self.rate(provider, pair.quote())?;
        if pair.base().eq_ignore_ascii_case(&self.base) {
            return Ok(quote_rate);
        }

        let base_rate = self.rate(provider, pair.base())?;
        let rate = quote_rate / base_rate;
        if !rate.is_finite() {
            return Err(RateError::malformed(
                provider,
                format!("Cannot derive {pair} from a zero rate for {}", pair.base()),
            ));
        }
        debug!(base = %self.base, quote_rate, base_rate, "Derived cross-rate");
        Ok(rate)
    }
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    fn name(&self) -> &'static str {
        "openexchangerates"
    }

    #[instrument(name = "OpenExchangeRatesFetch", skip(self, params), fields(pair = %pair))]
    async fn fetch_rate(&self, pair: &CurrencyPair, params: &ProviderParams) -> RateResult<f64> {
        let app_id = params
            .get(APP_ID)
            .filter(|id| !id.trim().is_empty())
            .ok_or(RateError::MissingParameter {
                provider: self.name(),
                parameter: APP_ID,
            })?;
        let query = query_with_params(&[(APP_ID, app_id.as_str())], params);

        let data: LatestResponse = self.http.get_json(self.name(), &self.url, &query).await?;
        data.rate_for(self.name(), pair)
    }
}
