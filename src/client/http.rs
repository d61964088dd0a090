//! Authenticating, retrying HTTP client.
//!
//! [`HttpClient`] sits on top of the transport stack and is the only thing the
//! incarnation operations talk to. It adds three things to every request:
//!
//! 1. `Authorization: Bearer <token>`
//! 2. a per-attempt timeout
//! 3. retries with exponential backoff (see [`RetryPolicy`])
//!
//! # Retry rules
//!
//! | Outcome | Idempotent method | `POST` |
//! |---------|-------------------|--------|
//! | connect failure | retried | retried |
//! | other transport error | retried | returned |
//! | 408, 425, 429, 500, 502, 503, 504 | retried | returned |
//! | any other status | returned | returned |
//!
//! When the attempts run out on a retryable status the last response is
//! returned as is, so the caller still sees the server's error message.

use super::config::RetryPolicy;
use super::utils::{is_idempotent, is_retryable_status};
use crate::error::{ConfigError, FoxopsError, Result};
use crate::transport::{Transport, TransportError};
use http::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// HTTP client with bearer authentication and retries.
///
/// Configuration is fixed at construction, so one instance can serve any
/// number of concurrent calls.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    authorization: HeaderValue,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a client that authenticates with `token`.
    ///
    /// Fails if the token is empty or cannot be sent in a header; a client is
    /// never created without credentials.
    pub fn new(
        token: &str,
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
        request_timeout: Duration,
    ) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(ConfigError::InvalidToken("token is empty".to_string()).into());
        }
        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| ConfigError::InvalidToken(err.to_string()))?;
        authorization.set_sensitive(true);

        Ok(HttpClient {
            transport,
            authorization,
            retry,
            request_timeout,
        })
    }

    /// The retry policy in use.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Send `request`, retrying according to the policy.
    pub async fn send(&self, mut request: Request) -> Result<Response> {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.authorization.clone());

        let idempotent = is_idempotent(request.method());
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            let last_attempt = attempt + 1 >= max_attempts;
            // Bodies that cannot be cloned only get one shot.
            let copy = if last_attempt {
                None
            } else {
                request.try_clone()
            };
            let Some(current) = copy else {
                return self
                    .execute_once(request)
                    .await
                    .map_err(|source| FoxopsError::Transport {
                        attempts: attempt + 1,
                        source,
                    });
            };

            match self.execute_once(current).await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !(idempotent && is_retryable_status(status)) {
                        return Ok(response);
                    }
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        "Request failed with status {} (attempt {}), retrying after {:?}",
                        status,
                        attempt + 1,
                        delay
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    if !(idempotent || err.is_connect()) {
                        return Err(FoxopsError::Transport {
                            attempts: attempt + 1,
                            source: err,
                        });
                    }
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        "Request failed (attempt {}), retrying after {:?}: {}",
                        attempt + 1,
                        delay,
                        err
                    );
                    sleep(delay).await;
                }
            }

            attempt += 1;
        }
    }

    async fn execute_once(&self, request: Request) -> std::result::Result<Response, TransportError> {
        match tokio::time::timeout(self.request_timeout, self.transport.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.request_timeout)),
        }
    }
}
