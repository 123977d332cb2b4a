//! Currency conversion abstractions

use crate::core::error::RateResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// Provider-specific keyword parameters, forwarded as query parameters.
pub type ProviderParams = BTreeMap<String, String>;

/// A base (`from`) and quote (`to`) currency code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyPair {
    from: String,
    to: String,
}

impl CurrencyPair {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        CurrencyPair {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.from
    }

    pub fn quote(&self) -> &str {
        &self.to
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

/// A single resolution request, built once per rule set evaluation.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub service: String,
    pub pair: CurrencyPair,
    pub amount: f64,
    pub params: ProviderParams,
}

impl ProviderRequest {
    pub fn new(service: impl Into<String>, pair: CurrencyPair) -> Self {
        ProviderRequest {
            service: service.into(),
            pair,
            amount: 1.0,
            params: ProviderParams::new(),
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_params(mut self, params: ProviderParams) -> Self {
        self.params = params;
        self
    }
}

/// Units of the quote currency for `amount` units of the base currency.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RateQuote(f64);

impl RateQuote {
    pub fn new(value: f64) -> Self {
        RateQuote(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for RateQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single remote service. Returns the raw rate for one unit of `pair.base()`.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_rate(&self, pair: &CurrencyPair, params: &ProviderParams) -> RateResult<f64>;
}

/// Resolves a full request, including provider selection and amount scaling.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn resolve(&self, request: &ProviderRequest) -> RateResult<RateQuote>;
}
