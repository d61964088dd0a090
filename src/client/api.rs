//! Capability interface for callers of the incarnation API.

use crate::context::Context;
use crate::error::Result;
use crate::types::{CreateIncarnationRequest, Incarnation, IncarnationId, UpdateIncarnationRequest};
use async_trait::async_trait;

/// The five incarnation operations.
///
/// This trait is the whole surface that resource and data source adapters
/// may use. [`crate::FoxopsClient`] implements it over HTTP;
/// [`crate::testing::InMemoryIncarnationApi`] implements it in memory.
#[async_trait]
pub trait IncarnationApi: Send + Sync {
    /// Fetch an incarnation.
    async fn get_incarnation(&self, ctx: &Context, id: &IncarnationId) -> Result<Incarnation>;

    /// Fetch an incarnation, polling until its merge request reaches `status`.
    ///
    /// Returns right away when the incarnation has no merge request. Bound the
    /// wait with a deadline on `ctx`.
    async fn get_incarnation_with_merge_request_status(
        &self,
        ctx: &Context,
        id: &IncarnationId,
        status: &str,
    ) -> Result<Incarnation>;

    /// Create an incarnation.
    async fn create_incarnation(
        &self,
        ctx: &Context,
        request: &CreateIncarnationRequest,
    ) -> Result<Incarnation>;

    /// Update an incarnation, producing a new commit and merge request.
    async fn update_incarnation(
        &self,
        ctx: &Context,
        id: &IncarnationId,
        request: &UpdateIncarnationRequest,
    ) -> Result<Incarnation>;

    /// Delete an incarnation.
    async fn delete_incarnation(&self, ctx: &Context, id: &IncarnationId) -> Result<()>;
}
