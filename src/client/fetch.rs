//! Main Foxops client implementation.
//!
//! Provides [`FoxopsClient`], which implements the incarnation operations on
//! top of [`HttpClient`].
//!
//! # Examples
//!
//! ## Reading an incarnation
//!
//! ```ignore
//! use foxops_client::{ClientConfig, Context, FoxopsClient, IncarnationId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FoxopsClient::new(ClientConfig::new(
//!         "https://foxops.example.com",
//!         "secret",
//!         env!("CARGO_PKG_VERSION"),
//!     ))?;
//!     let incarnation = client
//!         .get_incarnation(&Context::background(), &IncarnationId::from("1234"))
//!         .await?;
//!     println!("{} at {}", incarnation.incarnation_repository, incarnation.commit_sha);
//!     Ok(())
//! }
//! ```
//!
//! ## Updating and waiting for the merge
//!
//! ```ignore
//! use foxops_client::{Context, UpdateIncarnationRequest};
//! use std::time::Duration;
//!
//! let updated = client
//!     .update_incarnation(&ctx, &id, &UpdateIncarnationRequest::new("v2.0.0"))
//!     .await?;
//!
//! let ctx = Context::background().with_timeout(Duration::from_secs(60));
//! let merged = client
//!     .get_incarnation_with_merge_request_status(&ctx, &updated.id, "merged")
//!     .await?;
//! ```

use super::api::IncarnationApi;
use super::config::ClientConfig;
use super::http::HttpClient;
use super::utils::expect_status;
use super::wait::wait_for_merge_request_status;
use crate::context::Context;
use crate::error::{FoxopsError, Result};
use crate::protocol::wire::{
    decode_incarnation, DesiredIncarnationState, DesiredIncarnationStatePatch,
};
use crate::protocol::Endpoints;
use crate::transport::{LoggingTransport, ReqwestTransport, Transport, UserAgentTransport};
use crate::types::{
    validate_template_data, CreateIncarnationRequest, Incarnation, IncarnationId,
    UpdateIncarnationRequest,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{Method, StatusCode};
use reqwest::Request;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// Client for the Foxops incarnation API.
///
/// Cloning is cheap and clones share the connection pool. The client holds
/// no other state, so concurrent calls on one instance are independent.
#[derive(Clone, Debug)]
pub struct FoxopsClient {
    http: HttpClient,
    endpoints: Endpoints,
    config: Arc<ClientConfig>,
}

impl FoxopsClient {
    /// Create a client that talks to the network through `reqwest`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base = ReqwestTransport::new()
            .map_err(|source| FoxopsError::Transport { attempts: 0, source })?;
        Self::with_transport(config, base)
    }

    /// Create a client on top of a custom base transport.
    ///
    /// The User-Agent and logging layers are still added around it.
    pub fn with_transport<T>(config: ClientConfig, transport: T) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let endpoints = Endpoints::new(&config.endpoint)?;
        let stack = UserAgentTransport::new(
            &config.product,
            &config.version,
            LoggingTransport::new(transport),
        );
        let http = HttpClient::new(
            &config.token,
            Arc::new(stack),
            config.retry.clone(),
            config.request_timeout,
        )?;

        Ok(FoxopsClient {
            http,
            endpoints,
            config: Arc::new(config),
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET /api/incarnations/{id}`, expecting `200`.
    pub async fn get_incarnation(&self, ctx: &Context, id: &IncarnationId) -> Result<Incarnation> {
        let wire_id = id.to_wire()?;
        tracing::debug!(%id, "fetching incarnation");

        let request = Self::request(Method::GET, self.endpoints.incarnation(wire_id));
        let body = self.call(ctx, request, StatusCode::OK).await?;
        Ok(decode_incarnation(&body)?)
    }

    /// Poll [`FoxopsClient::get_incarnation`] until the merge request reaches `status`.
    ///
    /// See [`wait_for_merge_request_status`] for the stop conditions.
    pub async fn get_incarnation_with_merge_request_status(
        &self,
        ctx: &Context,
        id: &IncarnationId,
        status: &str,
    ) -> Result<Incarnation> {
        // Reject a bad id before polling.
        id.to_wire()?;
        tracing::info!(%id, status, "waiting for merge request status");

        wait_for_merge_request_status(ctx, id, status, self.config.poll_interval, || {
            self.get_incarnation(ctx, id)
        })
        .await
    }

    /// `POST /api/incarnations`, expecting `201`.
    pub async fn create_incarnation(
        &self,
        ctx: &Context,
        request: &CreateIncarnationRequest,
    ) -> Result<Incarnation> {
        validate_template_data(&request.template_data)?;
        tracing::info!(
            repository = %request.incarnation_repository,
            template = %request.template_repository,
            version = %request.template_repository_version,
            "creating incarnation"
        );

        let body = DesiredIncarnationState::from(request);
        let http_request = Self::json_request(Method::POST, self.endpoints.incarnations(), &body)?;
        let body = self.call(ctx, http_request, StatusCode::CREATED).await?;
        Ok(decode_incarnation(&body)?)
    }

    /// `PUT /api/incarnations/{id}`, expecting `200`.
    pub async fn update_incarnation(
        &self,
        ctx: &Context,
        id: &IncarnationId,
        request: &UpdateIncarnationRequest,
    ) -> Result<Incarnation> {
        let wire_id = id.to_wire()?;
        validate_template_data(&request.template_data)?;
        tracing::info!(
            %id,
            version = %request.template_repository_version,
            automerge = request.automerge,
            "updating incarnation"
        );

        let body = DesiredIncarnationStatePatch::from(request);
        let http_request =
            Self::json_request(Method::PUT, self.endpoints.incarnation(wire_id), &body)?;
        let body = self.call(ctx, http_request, StatusCode::OK).await?;
        Ok(decode_incarnation(&body)?)
    }

    /// `DELETE /api/incarnations/{id}`, expecting `204`.
    pub async fn delete_incarnation(&self, ctx: &Context, id: &IncarnationId) -> Result<()> {
        let wire_id = id.to_wire()?;
        tracing::info!(%id, "deleting incarnation");

        let request = Self::request(Method::DELETE, self.endpoints.incarnation(wire_id));
        self.call(ctx, request, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    /// Send under `ctx` and return the body of an `expected` response.
    async fn call(&self, ctx: &Context, request: Request, expected: StatusCode) -> Result<Bytes> {
        ctx.run(async move {
            let response = self.http.send(request).await?;
            expect_status(response, expected).await
        })
        .await?
    }

    fn request(method: Method, url: Url) -> Request {
        let mut request = Request::new(method, url);
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        request
    }

    fn json_request<B: Serialize>(method: Method, url: Url, body: &B) -> Result<Request> {
        let bytes = serde_json::to_vec(body).map_err(FoxopsError::Encode)?;
        let mut request = Self::request(method, url);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(bytes.into());
        Ok(request)
    }
}

#[async_trait]
impl IncarnationApi for FoxopsClient {
    async fn get_incarnation(&self, ctx: &Context, id: &IncarnationId) -> Result<Incarnation> {
        FoxopsClient::get_incarnation(self, ctx, id).await
    }

    async fn get_incarnation_with_merge_request_status(
        &self,
        ctx: &Context,
        id: &IncarnationId,
        status: &str,
    ) -> Result<Incarnation> {
        FoxopsClient::get_incarnation_with_merge_request_status(self, ctx, id, status).await
    }

    async fn create_incarnation(
        &self,
        ctx: &Context,
        request: &CreateIncarnationRequest,
    ) -> Result<Incarnation> {
        FoxopsClient::create_incarnation(self, ctx, request).await
    }

    async fn update_incarnation(
        &self,
        ctx: &Context,
        id: &IncarnationId,
        request: &UpdateIncarnationRequest,
    ) -> Result<Incarnation> {
        FoxopsClient::update_incarnation(self, ctx, id, request).await
    }

    async fn delete_incarnation(&self, ctx: &Context, id: &IncarnationId) -> Result<()> {
        FoxopsClient::delete_incarnation(self, ctx, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RetryPolicy;
    use crate::testing::ScriptedTransport;
    use crate::types::TemplateValue;
    use serde_json::json;

    fn setup() -> (FoxopsClient, ScriptedTransport) {
        let transport = ScriptedTransport::new();
        let config = ClientConfig::new("http://localhost", "dev-token", "testing")
            .with_retry(RetryPolicy::none());
        let client = FoxopsClient::with_transport(config, transport.clone()).unwrap();
        (client, transport)
    }

    fn incarnation_json() -> serde_json::Value {
        json!({
            "id": 1234,
            "incarnation_repository": "inc/repo",
            "template_repository": "template/repo",
            "template_repository_version": "v1",
            "target_directory": ".",
            "commit_sha": "12345678",
            "commit_url": "u"
        })
    }

    #[test]
    fn test_client_creation() {
        let (client, _) = setup();
        assert_eq!(client.config().retry.max_attempts, 1);
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = FoxopsClient::with_transport(
            ClientConfig::new("not a url", "t", "dev"),
            ScriptedTransport::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FoxopsError::Config(crate::error::ConfigError::InvalidEndpoint { ref endpoint, .. })
                if endpoint == "not a url"
        ));
    }

    #[tokio::test]
    async fn test_get_incarnation() {
        let (client, transport) = setup();
        transport.push_json(200, &incarnation_json());

        let got = client
            .get_incarnation(&Context::background(), &IncarnationId::from("1234"))
            .await
            .unwrap();

        assert_eq!(got.id.as_str(), "1234");
        assert_eq!(got.template_repository_version, "v1");
        assert_eq!(got.merge_request_id, None);
        assert_eq!(got.merge_request_status, None);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].path, "/api/incarnations/1234");
        assert_eq!(requests[0].header("authorization"), Some("Bearer dev-token"));
        assert!(requests[0]
            .header("user-agent")
            .unwrap()
            .starts_with("Foxops Terraform Provider/testing ("));
    }

    #[tokio::test]
    async fn test_invalid_id_sends_nothing() {
        let (client, transport) = setup();
        let ctx = Context::background();
        let id = IncarnationId::from("not-a-number");

        let err = client.get_incarnation(&ctx, &id).await.unwrap_err();
        assert!(matches!(err, FoxopsError::InvalidId { .. }));
        let err = client.delete_incarnation(&ctx, &id).await.unwrap_err();
        assert!(matches!(err, FoxopsError::InvalidId { .. }));
        let err = client
            .get_incarnation_with_merge_request_status(&ctx, &id, "merged")
            .await
            .unwrap_err();
        assert!(matches!(err, FoxopsError::InvalidId { .. }));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_create_sends_union_values() {
        let (client, transport) = setup();
        transport.push_json(201, &incarnation_json());

        let request = CreateIncarnationRequest::new("inc/repo", "template/repo", "v1")
            .with_template_value("name", "api")
            .with_template_value("replicas", 3)
            .with_template_value("ratio", 0.5);
        let got = client
            .create_incarnation(&Context::background(), &request)
            .await
            .unwrap();
        assert_eq!(got.commit_sha, "12345678");

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/api/incarnations");
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
        assert_eq!(
            requests[0].json().unwrap(),
            json!({
                "incarnation_repository": "inc/repo",
                "template_repository": "template/repo",
                "template_repository_version": "v1",
                "template_data": {"name": "api", "replicas": 3, "ratio": 0.5}
            })
        );
    }

    #[tokio::test]
    async fn test_create_rejects_nan_before_sending() {
        let (client, transport) = setup();
        let request = CreateIncarnationRequest::new("inc/repo", "template/repo", "v1")
            .with_template_value("ratio", TemplateValue::Float(f64::NAN));

        let err = client
            .create_incarnation(&Context::background(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, FoxopsError::InvalidTemplateData(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_expects_no_content() {
        let (client, transport) = setup();
        let ctx = Context::background();
        let id = IncarnationId::from("1234");

        transport.push_status(204);
        client.delete_incarnation(&ctx, &id).await.unwrap();

        transport.push_json(200, &json!({}));
        let err = client.delete_incarnation(&ctx, &id).await.unwrap_err();
        assert_eq!(err.status(), Some(200));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let (client, transport) = setup();
        transport.push_hang();
        let ctx = Context::background();
        let id = IncarnationId::from("1234");

        let call = client.get_incarnation(&ctx, &id);
        let cancel = async {
            tokio::task::yield_now().await;
            ctx.cancel();
        };
        let (result, ()) = tokio::join!(call, cancel);
        assert!(result.unwrap_err().is_cancelled());
    }
}
