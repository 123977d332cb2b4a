//! Core business logic abstractions

pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod notify;
pub mod rules;

// Re-export main types for cleaner imports
pub use config::{Action, ActionSet, RuleSet};
pub use currency::{CurrencyPair, ProviderParams, ProviderRequest, QuoteSource, RateQuote};
pub use error::{RateError, RateResult};
pub use notify::Notifier;
pub use rules::{ActionOutcome, BatchReport, Direction};
