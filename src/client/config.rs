//! Client configuration.
//!
//! [`ClientConfig`] is built once and is read-only afterwards; the client
//! shares it behind an `Arc`.
//!
//! # Examples
//!
//! ```
//! use foxops_client::client::{ClientConfig, RetryPolicy};
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("https://foxops.example.com", "secret", "1.4.0")
//!     .with_request_timeout(Duration::from_secs(60))
//!     .with_retry(RetryPolicy {
//!         max_attempts: 3,
//!         ..Default::default()
//!     });
//! assert_eq!(config.retry.max_attempts, 3);
//! ```

use crate::error::ConfigError;
use std::time::Duration;

/// Environment variable holding the API endpoint.
pub const ENDPOINT_ENV_VAR: &str = "FOXOPS_ENDPOINT";

/// Environment variable holding the API token.
pub const TOKEN_ENV_VAR: &str = "FOXOPS_TOKEN";

/// Product name sent in the User-Agent header.
pub const DEFAULT_PRODUCT: &str = "Foxops Terraform Provider";

/// Upper bound for a single HTTP attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Pause between two merge request status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Exponential backoff applied between attempts of a failed request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included. `1` disables retries.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Factor applied to the delay after every retry.
    pub multiplier: f64,

    /// Cap on a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy that sends every request exactly once.
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        super::utils::exponential_backoff(attempt, self.base_delay, self.multiplier, self.max_delay)
    }
}

/// Settings for [`crate::FoxopsClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the Foxops instance.
    pub endpoint: String,

    /// Bearer token sent with every request.
    pub token: String,

    /// Version reported in the User-Agent header.
    pub version: String,

    /// Product reported in the User-Agent header.
    pub product: String,

    /// Upper bound for a single HTTP attempt.
    pub request_timeout: Duration,

    /// Retry behaviour for failed requests.
    pub retry: RetryPolicy,

    /// Pause between merge request status polls.
    pub poll_interval: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .field("version", &self.version)
            .field("product", &self.product)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration with default timeouts and retry policy.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        ClientConfig {
            endpoint: endpoint.into(),
            token: token.into(),
            version: version.into(),
            product: DEFAULT_PRODUCT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Build a configuration from explicit values, falling back to
    /// `FOXOPS_ENDPOINT` and `FOXOPS_TOKEN` for the missing ones.
    ///
    /// Explicit values always win over the environment.
    pub fn resolve(
        endpoint: Option<&str>,
        token: Option<&str>,
        version: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with(endpoint, token, version, |name| std::env::var(name).ok())
    }

    /// Like [`ClientConfig::resolve`] with a custom variable lookup.
    pub fn resolve_with<F>(
        endpoint: Option<&str>,
        token: Option<&str>,
        version: impl Into<String>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = endpoint
            .map(str::to_string)
            .or_else(|| lookup(ENDPOINT_ENV_VAR))
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingEndpoint {
                env_var: ENDPOINT_ENV_VAR,
            })?;

        let token = token
            .map(str::to_string)
            .or_else(|| lookup(TOKEN_ENV_VAR))
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingToken {
                env_var: TOKEN_ENV_VAR,
            })?;

        Ok(ClientConfig::new(endpoint, token, version))
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
