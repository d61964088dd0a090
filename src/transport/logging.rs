//! Request/response logging.

use super::{Transport, TransportError};
use async_trait::async_trait;
use reqwest::{Request, Response};
use tokio::time::Instant;

/// Emits `tracing` events around every exchange.
///
/// Only the method, URL, status and timing are logged. Header values are
/// never logged, so the bearer token cannot leak into logs.
#[derive(Debug, Clone)]
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T> LoggingTransport<T> {
    /// Wrap `inner`.
    pub fn new(inner: T) -> Self {
        LoggingTransport { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let method = request.method().clone();
        let url = request.url().clone();
        let body_len = request
            .body()
            .and_then(|body| body.as_bytes())
            .map(<[u8]>::len);
        tracing::debug!(%method, %url, ?body_len, "sending request");

        let started = Instant::now();
        let result = self.inner.execute(request).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(response) => tracing::debug!(
                %method,
                %url,
                status = response.status().as_u16(),
                ?elapsed,
                "received response"
            ),
            Err(err) => tracing::debug!(%method, %url, ?elapsed, error = %err, "request failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use http::Method;

    #[tokio::test]
    async fn test_passes_errors_through() {
        let base = ScriptedTransport::new();
        base.push_connection_error("connection refused");
        let transport = LoggingTransport::new(base);

        let url = "http://localhost/api/incarnations".parse().unwrap();
        let err = transport
            .execute(Request::new(Method::POST, url))
            .await
            .unwrap_err();
        assert!(err.is_connect());
    }
}
