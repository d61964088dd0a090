//! Helpers for the resource and data source adapters.
//!
//! Adapters only see the [`IncarnationApi`] trait. The functions here cover
//! what both adapters share: reading an incarnation with an optional wait on
//! its merge request, and converting template data to and from the string
//! maps stored in state.

use crate::client::IncarnationApi;
use crate::context::Context;
use crate::error::{ConfigError, FoxopsError, Result};
use crate::types::{Incarnation, IncarnationId, MergeRequestStatus, TemplateData, TemplateValue};
use std::collections::BTreeMap;
use std::time::Duration;

/// Wait applied when [`WaitForStatus::timeout`] is not set.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Summary for a wait that ran out of time.
pub const WAIT_TIMEOUT_SUMMARY: &str =
    "operation timed out before the merge request status reached the expected status";

/// Summary for any other read failure.
pub const READ_FAILURE_SUMMARY: &str = "failed to retrieve incarnation";

/// Wait for the latest merge request to reach `status` before returning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitForStatus {
    pub status: MergeRequestStatus,
    /// Sequence of numbers with unit suffixes, e.g. `1m30s`.
    pub timeout: Option<String>,
}

impl WaitForStatus {
    pub fn new(status: MergeRequestStatus) -> Self {
        WaitForStatus {
            status,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// The configured timeout, or [`DEFAULT_WAIT_TIMEOUT`].
    pub fn timeout(&self) -> std::result::Result<Duration, ConfigError> {
        match &self.timeout {
            Some(value) => parse_timeout(value),
            None => Ok(DEFAULT_WAIT_TIMEOUT),
        }
    }
}

/// Parse a timeout such as `10s`, `1m30s`, `2h` or `500ms`.
///
/// Any duration [`humantime`] understands is accepted, including `us`/`ns`
/// and spaced forms like `2h 37min`. Fractional amounts are not: `1.5s` must
/// be written `1s500ms`.
///
/// ```
/// use foxops_client::provider::parse_timeout;
/// use std::time::Duration;
///
/// assert_eq!(parse_timeout("1m30s").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_timeout("500ms").unwrap(), Duration::from_millis(500));
/// assert!(parse_timeout("1.5s").is_err());
/// ```
pub fn parse_timeout(value: &str) -> std::result::Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidTimeout {
        value: value.to_string(),
        reason,
    };

    let trimmed = value.trim();
    if trimmed.contains('.') {
        return Err(invalid(
            "fractional amounts are not supported, use a smaller unit such as 1s500ms".to_string(),
        ));
    }
    humantime::parse_duration(trimmed).map_err(|err| invalid(err.to_string()))
}

/// Fetch an incarnation, optionally waiting on its merge request.
///
/// Without `wait` this is a single read. With `wait` the read polls under a
/// child of `ctx` limited to the wait's timeout.
pub async fn read_incarnation(
    api: &dyn IncarnationApi,
    ctx: &Context,
    id: &IncarnationId,
    wait: Option<&WaitForStatus>,
) -> Result<Incarnation> {
    let Some(wait) = wait else {
        tracing::info!(%id, "fetching the incarnation");
        return api.get_incarnation(ctx, id).await;
    };

    let timeout = wait.timeout()?;
    let status = wait.status.as_str();
    tracing::info!(%id, status, ?timeout, "fetching the incarnation");

    let wait_ctx = ctx.with_timeout(timeout);
    let result = api
        .get_incarnation_with_merge_request_status(&wait_ctx, id, status)
        .await;

    if let Ok(incarnation) = &result {
        if incarnation.merge_request_id.is_none() {
            tracing::info!(
                id = %incarnation.id,
                "No merge request in progress, there was no status to wait for"
            );
        }
    }
    result
}

/// One-line summary suitable for a diagnostic.
pub fn failure_summary(err: &FoxopsError) -> &'static str {
    match err {
        FoxopsError::WaitTimedOut { .. } => WAIT_TIMEOUT_SUMMARY,
        _ => READ_FAILURE_SUMMARY,
    }
}

/// Template data from a string-valued state map.
///
/// Every value is sent as a string.
pub fn template_data_from_strings(values: &BTreeMap<String, String>) -> TemplateData {
    values
        .iter()
        .map(|(key, value)| (key.clone(), TemplateValue::String(value.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryIncarnationApi;
    use crate::types::{CreateIncarnationRequest, UpdateIncarnationRequest};

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_timeout("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_timeout("1h2m3s").unwrap(), Duration::from_secs(3723));
        assert_eq!(parse_timeout("1s500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_timeout("300us").unwrap(), Duration::from_micros(300));
        assert_eq!(parse_timeout("2h 37min").unwrap(), Duration::from_secs(9420));
        assert!(parse_timeout("").is_err());
        assert!(parse_timeout("s").is_err());
        assert!(parse_timeout("10 parsecs").is_err());
    }

    #[test]
    fn test_parse_timeout_rejects_fractions_by_name() {
        for value in ["1.5s", "2m0.5s"] {
            match parse_timeout(value) {
                Err(ConfigError::InvalidTimeout { reason, .. }) => {
                    assert!(reason.contains("fractional"), "{value}: {reason}");
                }
                other => panic!("{value}: unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn test_default_wait_timeout() {
        let wait = WaitForStatus::new(MergeRequestStatus::Merged);
        assert_eq!(wait.timeout().unwrap(), Duration::from_secs(10));
        let wait = wait.with_timeout("abc");
        assert!(wait.timeout().is_err());
    }

    #[test]
    fn test_template_data_from_strings() {
        let mut values = BTreeMap::new();
        values.insert("replicas".to_string(), "3".to_string());
        let data = template_data_from_strings(&values);
        assert_eq!(data["replicas"], TemplateValue::String("3".into()));
    }

    async fn updated(api: &InMemoryIncarnationApi, automerge: bool) -> Incarnation {
        let ctx = Context::background();
        let created = api
            .create_incarnation(
                &ctx,
                &CreateIncarnationRequest::new("inc/repo", "template/repo", "v1"),
            )
            .await
            .unwrap();
        api.update_incarnation(
            &ctx,
            &created.id,
            &UpdateIncarnationRequest::new("v2").with_automerge(automerge),
        )
        .await
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_without_wait() {
        let api = InMemoryIncarnationApi::new();
        let incarnation = updated(&api, false).await;

        let got = read_incarnation(&api, &Context::background(), &incarnation.id, None)
            .await
            .unwrap();
        assert_eq!(got, incarnation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_wait_times_out() {
        let api = InMemoryIncarnationApi::new();
        let incarnation = updated(&api, false).await;
        let wait = WaitForStatus::new(MergeRequestStatus::Merged).with_timeout("3s");

        let start = tokio::time::Instant::now();
        let err = read_incarnation(&api, &Context::background(), &incarnation.id, Some(&wait))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(failure_summary(&err), WAIT_TIMEOUT_SUMMARY);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_wait_sees_status_change() {
        let api = InMemoryIncarnationApi::new();
        let incarnation = updated(&api, false).await;
        let wait = WaitForStatus::new(MergeRequestStatus::Closed).with_timeout("1m");

        let mover = {
            let api = api.clone();
            let id = incarnation.id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(2500)).await;
                api.set_merge_request_status(&id, MergeRequestStatus::Closed);
            })
        };

        let got = read_incarnation(&api, &Context::background(), &incarnation.id, Some(&wait))
            .await
            .unwrap();
        mover.await.unwrap();
        assert_eq!(got.merge_request_state(), Some(MergeRequestStatus::Closed));
    }

    #[tokio::test]
    async fn test_read_failure_summary() {
        let api = InMemoryIncarnationApi::new();
        let err = read_incarnation(&api, &Context::background(), &IncarnationId::from("9"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(failure_summary(&err), READ_FAILURE_SUMMARY);
    }
}
