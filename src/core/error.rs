//! Error taxonomy for rate resolution and rule evaluation.

use thiserror::Error;

/// Errors that abort the evaluation of a single rule set.
#[derive(Debug, Error)]
pub enum RateError {
    /// The rule set lacks `from`, `to` or `service`.
    #[error("Missing required field(s): {}", fields.join(", "))]
    MissingField { fields: Vec<&'static str> },

    /// The rule set could not be parsed or holds an invalid value.
    #[error("Invalid rule set: {reason}")]
    InvalidRuleSet { reason: String },

    /// A provider needs a parameter (usually a credential) that was not supplied.
    #[error("Provider {provider} requires parameter '{parameter}' in service_kwargs")]
    MissingParameter {
        provider: &'static str,
        parameter: &'static str,
    },

    /// The service identifier matches none of the known providers.
    #[error("Unsupported provider: {service}")]
    UnsupportedProvider { service: String },

    /// Network failure, timeout or non-success HTTP status.
    #[error("Remote service error ({provider}): {reason}")]
    RemoteService {
        provider: &'static str,
        reason: String,
    },

    /// The response body did not contain the expected field path.
    #[error("Malformed response ({provider}): {reason}")]
    MalformedResponse {
        provider: &'static str,
        reason: String,
    },

    /// Writing to the output or notification surface failed.
    #[error("Output error: {0}")]
    Surface(#[from] std::io::Error),
}

impl RateError {
    pub(crate) fn remote(provider: &'static str, reason: impl Into<String>) -> Self {
        RateError::RemoteService {
            provider,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(provider: &'static str, reason: impl Into<String>) -> Self {
        RateError::MalformedResponse {
            provider,
            reason: reason.into(),
        }
    }
}

pub type RateResult<T> = Result<T, RateError>;
