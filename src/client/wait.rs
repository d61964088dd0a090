//! Waiting for a merge request to reach a status.
//!
//! Polls are strictly sequential, one every poll interval, and there is no
//! attempt limit: the deadline on the [`Context`] is what bounds the wait.
//! A long deadline therefore means many requests; with the default interval
//! of one second, a ten minute deadline allows up to six hundred polls.

use crate::context::{Context, ContextError};
use crate::error::{FoxopsError, Result};
use crate::types::{Incarnation, IncarnationId};
use std::future::Future;
use std::time::Duration;

/// Fetch with `fetch` until the merge request reaches `status`.
///
/// Stops on the first of:
/// - the incarnation has no merge request (nothing to wait for)
/// - the status equals `status` exactly
/// - `fetch` fails, or the context ends while sleeping
///
/// A deadline is reported as [`FoxopsError::WaitTimedOut`] with the last
/// incarnation seen; every other failure is returned unchanged.
pub async fn wait_for_merge_request_status<F, Fut>(
    ctx: &Context,
    id: &IncarnationId,
    status: &str,
    interval: Duration,
    mut fetch: F,
) -> Result<Incarnation>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Incarnation>>,
{
    let mut last_seen: Option<Incarnation> = None;
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        let incarnation = match fetch().await {
            Ok(incarnation) => incarnation,
            Err(err) => return Err(wait_error(err, id, status, last_seen)),
        };

        if incarnation.merge_request_id.is_none() {
            tracing::debug!(%id, polls, "no merge request to wait for");
            return Ok(incarnation);
        }
        if incarnation.merge_request_status.as_deref() == Some(status) {
            tracing::debug!(%id, polls, status, "merge request reached status");
            return Ok(incarnation);
        }

        tracing::debug!(
            %id,
            polls,
            wanted = status,
            current = ?incarnation.merge_request_status,
            "merge request status not reached yet"
        );
        last_seen = Some(incarnation);

        if let Err(err) = ctx.sleep(interval).await {
            return Err(wait_error(err.into(), id, status, last_seen));
        }
    }
}

fn wait_error(
    err: FoxopsError,
    id: &IncarnationId,
    status: &str,
    last_seen: Option<Incarnation>,
) -> FoxopsError {
    match err {
        FoxopsError::Context(ContextError::DeadlineExceeded) => FoxopsError::WaitTimedOut {
            id: id.clone(),
            status: status.to_string(),
            last_seen: last_seen.map(Box::new),
            source: ContextError::DeadlineExceeded,
        },
        other => other,
    }
}
