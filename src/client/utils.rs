//! Helpers shared by the client operations.
//!
//! - Status code classification for retries
//! - Exponential backoff
//! - Expected-status checks and error body decoding

use crate::error::{ApiError, DecodeError, FoxopsError, Result};
use crate::protocol::wire::ApiErrorBody;
use bytes::Bytes;
use http::{Method, StatusCode};
use reqwest::Response;
use std::time::Duration;

/// Check if status code indicates a transient server-side failure.
///
/// ```
/// use foxops_client::client::is_retryable_status;
///
/// assert!(is_retryable_status(503));
/// assert!(!is_retryable_status(404));
/// ```
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504)
}

/// Check if repeating a request with this method has no additional effect.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

/// Exponential backoff delay calculation
///
/// Returns `base * multiplier^attempt`, capped at `max`.
///
/// ```
/// use foxops_client::client::exponential_backoff;
/// use std::time::Duration;
///
/// let delay = exponential_backoff(2, Duration::from_millis(100), 2.0, Duration::from_secs(1));
/// assert_eq!(delay, Duration::from_millis(400));
/// ```
pub fn exponential_backoff(attempt: u32, base: Duration, multiplier: f64, max: Duration) -> Duration {
    let factor = multiplier.max(1.0).powi(attempt.min(32) as i32);
    let delay = base.as_secs_f64() * factor;
    if !delay.is_finite() || delay >= max.as_secs_f64() {
        max
    } else {
        Duration::from_secs_f64(delay)
    }
}

/// Return the body if the response carries `expected`, the server's error otherwise.
///
/// On a mismatch the body is read and decoded as `{"message": ...}`. Whatever
/// happens while doing so becomes the cause of
/// [`FoxopsError::UnexpectedStatus`], which also carries both status codes.
pub(crate) async fn expect_status(response: Response, expected: StatusCode) -> Result<Bytes> {
    let actual = response.status();
    if actual == expected {
        return response
            .bytes()
            .await
            .map_err(|err| FoxopsError::Decode(DecodeError::Read(err)));
    }

    let cause = match response.bytes().await {
        Err(err) => ApiError::UnreadableBody(err),
        Ok(body) => match serde_json::from_slice::<ApiErrorBody>(&body) {
            Ok(error) => ApiError::Message {
                message: error.message,
            },
            Err(err) => ApiError::UndecodableBody(err),
        },
    };
    tracing::debug!(
        expected = expected.as_u16(),
        actual = actual.as_u16(),
        cause = %cause,
        "unexpected response status"
    );

    Err(FoxopsError::UnexpectedStatus {
        expected: expected.as_u16(),
        actual: actual.as_u16(),
        source: cause,
    })
}
