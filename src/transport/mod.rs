//! Pluggable HTTP transports.
//!
//! A [`Transport`] sends one fully built [`reqwest::Request`] and hands back
//! the response. Transports wrap each other to add behaviour, and the client
//! composes them as follows, outermost first:
//!
//! ```text
//! HttpClient (bearer token, retries, per-attempt timeout)
//! └── UserAgentTransport   - stamps User-Agent
//!     └── LoggingTransport - tracing events per exchange
//!         └── base         - ReqwestTransport, or a test double
//! ```
//!
//! The base is replaceable so tests can run the whole stack without a network,
//! see [`crate::testing::ScriptedTransport`].

mod logging;
mod user_agent;

pub use logging::LoggingTransport;
pub use user_agent::{user_agent, UserAgentTransport};

use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single request/response exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Error reported by `reqwest`.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// No response within the per-attempt timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Whether the request certainly never reached the server.
    pub fn is_connect(&self) -> bool {
        match self {
            TransportError::Http(err) => err.is_connect(),
            TransportError::Connection(_) => true,
            TransportError::Timeout(_) => false,
        }
    }

    /// Whether the exchange timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Http(err) => err.is_timeout(),
            TransportError::Timeout(_) => true,
            TransportError::Connection(_) => false,
        }
    }
}

/// Sends a request and returns the raw response.
///
/// Implementations must not interpret the status code; that is the caller's
/// job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one exchange.
    async fn execute(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        (**self).execute(request).await
    }
}

/// Default base transport backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with connection pooling tuned for a single API host.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(ReqwestTransport { client })
    }

    /// Reuse an existing client, for custom TLS or proxy settings.
    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        Ok(self.client.execute(request).await?)
    }
}
