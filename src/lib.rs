#![doc = include_str!("../README.md")]

//! # Foxops client: incarnations over HTTP
//!
//! This crate talks to the incarnation API of a [Foxops] instance. An
//! *incarnation* is a copy of a template repository rendered into a target
//! repository; updating it opens a merge request carrying the new template
//! version.
//!
//! ## Overview
//!
//! The crate is layered, leaves first:
//!
//! 1. **Transport** - pluggable request executor, plus the User-Agent and
//!    logging layers
//! 2. **HTTP client** - bearer authentication, retries with exponential
//!    backoff, per-attempt timeout
//! 3. **Wire mapping** - JSON documents to typed incarnations, including the
//!    string / integer / float template data union
//! 4. **Incarnation client** - create, read, update, delete, and waiting for a
//!    merge request status
//!
//! Every operation takes a [`Context`] that carries cancellation and an
//! optional deadline.
//!
//! ## Client Usage
//!
//! ```ignore
//! use foxops_client::{ClientConfig, Context, FoxopsClient, UpdateIncarnationRequest};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::resolve(None, None, env!("CARGO_PKG_VERSION"))?;
//!     let client = FoxopsClient::new(config)?;
//!     let ctx = Context::background();
//!
//!     let id = "1234".into();
//!     let updated = client
//!         .update_incarnation(&ctx, &id, &UpdateIncarnationRequest::new("v2.0.0"))
//!         .await?;
//!
//!     // Give the merge request one minute to get merged.
//!     let wait = ctx.with_timeout(Duration::from_secs(60));
//!     match client
//!         .get_incarnation_with_merge_request_status(&wait, &updated.id, "merged")
//!         .await
//!     {
//!         Ok(incarnation) => println!("merged at {}", incarnation.commit_sha),
//!         Err(err) if err.is_timeout() => eprintln!("still not merged"),
//!         Err(err) => return Err(err.into()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Incarnations, requests, template values
//! - **[error]** - Error types and result handling
//! - **[context]** - Cancellation and deadlines
//! - **[transport]** - Pluggable transports and wrapping layers
//! - **[client]** - Authenticating, retrying client and the incarnation operations
//! - **[protocol]** - Endpoints and JSON wire documents
//! - **[provider]** - Helpers for infrastructure-as-code adapters
//! - **[testing]** - Test doubles
//!
//! [Foxops]: https://github.com/Roche/foxops

pub mod client;
pub mod context;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod testing;
pub mod transport;
pub mod types;

pub use client::{ClientConfig, FoxopsClient, IncarnationApi, RetryPolicy};
pub use context::{Context, ContextError};
pub use error::{
    ApiError, ConfigError, DecodeError, FoxopsError, Result, TemplateDataError, TemplateDataErrors,
};
pub use types::{
    CreateIncarnationRequest, Incarnation, IncarnationId, MergeRequestStatus, TemplateData,
    TemplateValue, UpdateIncarnationRequest,
};
