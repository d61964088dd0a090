//! Foxops incarnation client.
//!
//! This module provides the HTTP client for the incarnation API:
//!
//! - **Create, read, update and delete** incarnations
//! - **Wait** for the merge request of an incarnation to reach a status
//! - **Authenticate** every request with a bearer token
//! - **Automatically retry** failed requests with exponential backoff
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── api    - IncarnationApi capability trait
//! ├── config - Client configuration and retry policy
//! ├── fetch  - FoxopsClient and the incarnation operations
//! ├── http   - Bearer auth, retries and per-attempt timeout
//! ├── wait   - Merge request status polling
//! └── utils  - Status classification, backoff, error bodies
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`FoxopsClient`] | Incarnation client over HTTP |
//! | [`IncarnationApi`] | The operations, as a trait |
//! | [`ClientConfig`] | Client configuration options |
//! | [`RetryPolicy`] | Backoff between attempts |
//! | [`HttpClient`] | Authenticating, retrying sender |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use foxops_client::client::{ClientConfig, FoxopsClient, RetryPolicy};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // Default configuration
//! let client = FoxopsClient::new(ClientConfig::new("http://localhost", "token", "dev")).unwrap();
//!
//! // Custom configuration
//! let config = ClientConfig::new("http://localhost", "token", "dev").with_retry(RetryPolicy {
//!     max_attempts: 3,
//!     ..Default::default()
//! });
//! let client = FoxopsClient::new(config).unwrap();
//! assert_eq!(client.config().retry.max_attempts, 3);
//! # }
//! ```
//!
//! ## Utility Functions
//!
//! ```
//! use foxops_client::client::{exponential_backoff, is_retryable_status};
//! use std::time::Duration;
//!
//! // Check if status is retryable
//! assert!(is_retryable_status(503));
//! assert!(!is_retryable_status(404));
//!
//! // Calculate backoff delay
//! let delay = exponential_backoff(2, Duration::from_millis(100), 2.0, Duration::from_secs(30));
//! assert_eq!(delay, Duration::from_millis(400));
//! ```

mod api;
mod config;
mod fetch;
mod http;
mod utils;
pub mod wait;

pub use api::IncarnationApi;
pub use config::{
    ClientConfig, RetryPolicy, DEFAULT_POLL_INTERVAL, DEFAULT_PRODUCT, DEFAULT_REQUEST_TIMEOUT,
    ENDPOINT_ENV_VAR, TOKEN_ENV_VAR,
};
pub use fetch::FoxopsClient;
pub use http::HttpClient;
pub use utils::{exponential_backoff, is_idempotent, is_retryable_status};
