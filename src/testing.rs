//! Test doubles.
//!
//! - [`ScriptedTransport`] stands in for the network below the client stack.
//!   It replays queued replies and records what was sent.
//! - [`InMemoryIncarnationApi`] stands in for the whole client behind the
//!   [`IncarnationApi`] trait.
//!
//! # Examples
//!
//! ```
//! use foxops_client::testing::ScriptedTransport;
//! use foxops_client::{ClientConfig, Context, FoxopsClient, IncarnationId};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let transport = ScriptedTransport::new();
//! transport.push_status(204);
//!
//! let client = FoxopsClient::with_transport(
//!     ClientConfig::new("http://localhost", "token", "dev"),
//!     transport.clone(),
//! )
//! .unwrap();
//! client
//!     .delete_incarnation(&Context::background(), &IncarnationId::from("7"))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(transport.requests()[0].path, "/api/incarnations/7");
//! # }
//! ```

use crate::client::{wait::wait_for_merge_request_status, IncarnationApi, DEFAULT_POLL_INTERVAL};
use crate::context::Context;
use crate::error::{ApiError, FoxopsError, Result};
use crate::transport::{Transport, TransportError};
use crate::types::{
    validate_template_data, CreateIncarnationRequest, Incarnation, IncarnationId,
    MergeRequestStatus, UpdateIncarnationRequest,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method};
use parking_lot::Mutex;
use reqwest::{Request, Response};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A request as seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RecordedRequest {
    /// First value of header `name`, if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// All values of header `name`.
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok().map(str::to_string))
            .collect()
    }

    /// The body parsed as JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.body
            .as_ref()
            .and_then(|body| serde_json::from_slice(body).ok())
    }
}

enum Reply {
    Response { status: u16, body: Bytes },
    ConnectionError(String),
    Hang,
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    requests: Vec<RecordedRequest>,
}

/// Base transport that replays queued replies in order.
///
/// Clones share the same queue and request log. Once the queue is empty
/// every request fails with a connection error.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an empty response.
    pub fn push_status(&self, status: u16) {
        self.push_body(status, Bytes::new());
    }

    /// Queue a response with a raw body.
    pub fn push_body(&self, status: u16, body: impl Into<Bytes>) {
        self.script.lock().replies.push_back(Reply::Response {
            status,
            body: body.into(),
        });
    }

    /// Queue a JSON response.
    pub fn push_json<T: Serialize>(&self, status: u16, body: &T) {
        let body = serde_json::to_vec(body).unwrap_or_default();
        self.push_body(status, body);
    }

    /// Queue a connection failure.
    pub fn push_connection_error(&self, message: &str) {
        self.script
            .lock()
            .replies
            .push_back(Reply::ConnectionError(message.to_string()));
    }

    /// Queue a reply that never arrives.
    pub fn push_hang(&self) {
        self.script.lock().replies.push_back(Reply::Hang);
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().requests.len()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        self.script.lock().replies.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: Request) -> std::result::Result<Response, TransportError> {
        let recorded = RecordedRequest {
            method: request.method().clone(),
            path: request.url().path().to_string(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body: request
                .body()
                .and_then(|body| body.as_bytes())
                .map(Bytes::copy_from_slice),
        };

        let reply = {
            let mut script = self.script.lock();
            script.requests.push(recorded);
            script.replies.pop_front()
        };

        match reply {
            Some(Reply::Response { status, body }) => {
                let mut builder = http::Response::builder().status(status);
                if !body.is_empty() {
                    builder = builder.header(CONTENT_TYPE, "application/json");
                }
                builder
                    .body(body)
                    .map(Response::from)
                    .map_err(|err| TransportError::Connection(Box::new(err)))
            }
            Some(Reply::ConnectionError(message)) => Err(TransportError::Connection(message.into())),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(TransportError::Connection("no scripted reply left".into())),
        }
    }
}

#[derive(Default)]
struct Store {
    next_id: i64,
    next_merge_request: i64,
    incarnations: BTreeMap<i64, Incarnation>,
}

/// [`IncarnationApi`] kept entirely in memory.
///
/// Creating assigns sequential ids starting at 1. Updating records a new
/// commit and merge request, `merged` when auto-merge is on and `open`
/// otherwise. Use [`InMemoryIncarnationApi::set_merge_request_status`] to move
/// an open merge request along.
#[derive(Clone)]
pub struct InMemoryIncarnationApi {
    store: Arc<Mutex<Store>>,
    poll_interval: Duration,
}

impl Default for InMemoryIncarnationApi {
    fn default() -> Self {
        InMemoryIncarnationApi {
            store: Arc::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl InMemoryIncarnationApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overwrite the merge request status of an incarnation.
    ///
    /// Returns `false` if the incarnation does not exist.
    pub fn set_merge_request_status(&self, id: &IncarnationId, status: MergeRequestStatus) -> bool {
        let Ok(wire_id) = id.to_wire() else {
            return false;
        };
        match self.store.lock().incarnations.get_mut(&wire_id) {
            Some(incarnation) => {
                incarnation.merge_request_status = Some(status.to_string());
                true
            }
            None => false,
        }
    }

    /// Number of stored incarnations.
    pub fn len(&self) -> usize {
        self.store.lock().incarnations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn not_found(expected: u16) -> FoxopsError {
        FoxopsError::UnexpectedStatus {
            expected,
            actual: 404,
            source: ApiError::Message {
                message: "incarnation not found".to_string(),
            },
        }
    }

    fn commit(repository: &str, serial: i64) -> (String, String) {
        let sha = format!("{serial:040x}");
        let url = format!("https://git.example.com/{repository}/-/commit/{sha}");
        (sha, url)
    }
}

#[async_trait]
impl IncarnationApi for InMemoryIncarnationApi {
    async fn get_incarnation(&self, ctx: &Context, id: &IncarnationId) -> Result<Incarnation> {
        let wire_id = id.to_wire()?;
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        self.store
            .lock()
            .incarnations
            .get(&wire_id)
            .cloned()
            .ok_or_else(|| Self::not_found(200))
    }

    async fn get_incarnation_with_merge_request_status(
        &self,
        ctx: &Context,
        id: &IncarnationId,
        status: &str,
    ) -> Result<Incarnation> {
        wait_for_merge_request_status(ctx, id, status, self.poll_interval, || {
            self.get_incarnation(ctx, id)
        })
        .await
    }

    async fn create_incarnation(
        &self,
        ctx: &Context,
        request: &CreateIncarnationRequest,
    ) -> Result<Incarnation> {
        validate_template_data(&request.template_data)?;
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let mut store = self.store.lock();
        store.next_id += 1;
        let id = store.next_id;
        let (commit_sha, commit_url) = Self::commit(&request.incarnation_repository, id);

        let incarnation = Incarnation {
            id: IncarnationId::from(id),
            incarnation_repository: request.incarnation_repository.clone(),
            target_directory: request
                .target_directory
                .clone()
                .unwrap_or_else(|| ".".to_string()),
            template_repository: request.template_repository.clone(),
            template_repository_version: request.template_repository_version.clone(),
            template_data: request.template_data.clone(),
            commit_sha,
            commit_url,
            merge_request_id: None,
            merge_request_url: None,
            merge_request_status: None,
        };
        store.incarnations.insert(id, incarnation.clone());
        Ok(incarnation)
    }

    async fn update_incarnation(
        &self,
        ctx: &Context,
        id: &IncarnationId,
        request: &UpdateIncarnationRequest,
    ) -> Result<Incarnation> {
        let wire_id = id.to_wire()?;
        validate_template_data(&request.template_data)?;
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let mut store = self.store.lock();
        store.next_merge_request += 1;
        let merge_request = store.next_merge_request;
        let incarnation = store
            .incarnations
            .get_mut(&wire_id)
            .ok_or_else(|| Self::not_found(200))?;

        let (commit_sha, commit_url) =
            Self::commit(&incarnation.incarnation_repository, 1_000_000 + merge_request);
        let status = if request.automerge {
            MergeRequestStatus::Merged
        } else {
            MergeRequestStatus::Open
        };

        incarnation.template_repository_version = request.template_repository_version.clone();
        incarnation.template_data = request.template_data.clone();
        incarnation.commit_sha = commit_sha;
        incarnation.commit_url = commit_url;
        incarnation.merge_request_id = Some(merge_request.to_string());
        incarnation.merge_request_url = Some(format!(
            "https://git.example.com/{}/-/merge_requests/{merge_request}",
            incarnation.incarnation_repository
        ));
        incarnation.merge_request_status = Some(status.to_string());

        Ok(incarnation.clone())
    }

    async fn delete_incarnation(&self, ctx: &Context, id: &IncarnationId) -> Result<()> {
        let wire_id = id.to_wire()?;
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        self.store
            .lock()
            .incarnations
            .remove(&wire_id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(204))
    }
}
