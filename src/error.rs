use std::time::Duration;
use thiserror::Error;

/// Error categorization shared by the retry engine and the search adapters
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Environment error: {0}")]
    Env(#[from] envy::Error),

    // I/O errors (potentially transient)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors (usually permanent)
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Network errors (transient - should retry)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network timeout after {timeout:?}: {message}")]
    NetworkTimeout { timeout: Duration, message: String },

    #[error("Connection refused: {endpoint}")]
    ConnectionRefused { endpoint: String },

    #[error("Rate limit exceeded: retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    // Client errors (permanent - don't retry)
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Unexpected HTTP status from {service}: {status}")]
    UnexpectedStatus { service: String, status: u16 },

    // Server errors (transient - should retry)
    #[error("Service temporarily unavailable: {service} - {reason}")]
    ServiceUnavailable { service: String, reason: String },

    #[error("Timeout error: operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    // Parse errors
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    // Provider errors
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Error categorization for retry strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Permanent errors - should not retry
    Permanent,
    /// Transient errors - safe to retry
    Transient,
    /// Rate limited - retry after a cooldown
    RateLimited,
}

impl Error {
    /// Categorize error for retry logic
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            // Permanent errors - don't retry
            Self::Config(_)
            | Self::Env(_)
            | Self::InvalidInput { .. }
            | Self::AuthenticationFailed(_)
            | Self::UnexpectedStatus { .. }
            | Self::Parse { .. }
            | Self::Serde(_) => ErrorCategory::Permanent,

            // Rate limited - retry with cooldown and backoff
            Self::RateLimitExceeded { .. } => ErrorCategory::RateLimited,

            // Transient errors - retry with exponential backoff
            Self::Http(_)
            | Self::NetworkTimeout { .. }
            | Self::ConnectionRefused { .. }
            | Self::ServiceUnavailable { .. }
            | Self::Timeout { .. }
            | Self::Io(_)
            | Self::Provider(_) => ErrorCategory::Transient,
        }
    }

    /// Check if error is retryable
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transient | ErrorCategory::RateLimited
        )
    }

    /// Get suggested retry delay for rate limited errors
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Classify a failed request by what went wrong on the wire.
    ///
    /// Request URLs carry API keys in their query, so only the redacted
    /// endpoint and the URL-free error text end up in the result.
    pub(crate) fn from_request(err: reqwest::Error, service: &str, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::NetworkTimeout {
                timeout,
                message: format!("{service}: {}", redacted_message(err)),
            }
        } else if err.is_connect() {
            Self::ConnectionRefused {
                endpoint: err
                    .url()
                    .map_or_else(|| service.to_string(), redacted_endpoint),
            }
        } else if err.is_decode() {
            Self::Parse {
                context: service.to_string(),
                message: redacted_message(err),
            }
        } else if err.is_builder() || err.is_redirect() {
            Self::InvalidInput {
                field: service.to_string(),
                reason: redacted_message(err),
            }
        } else {
            Self::Http(err.without_url())
        }
    }
}

/// `scheme://host[:port]/path` with credentials, query and fragment removed
#[must_use]
pub fn redacted_endpoint(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    // Fails only for URLs that cannot carry credentials
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.to_string()
}

/// Error text plus its causes, without the request URL
#[must_use]
pub fn redacted_message(err: reqwest::Error) -> String {
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}

pub type Result<T> = std::result::Result<T, Error>;
