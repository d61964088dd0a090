//! Cancellable, deadline-bearing execution context.
//!
//! Every client operation takes a [`Context`]. A context ends either when its
//! deadline passes or when it (or any ancestor) is cancelled; whatever the
//! operation was doing at that point, a network call or a sleep between polls,
//! returns promptly with a [`ContextError`].
//!
//! # Examples
//!
//! ```
//! use foxops_client::Context;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let root = Context::background();
//! let ctx = root.with_timeout(Duration::from_secs(10));
//! assert!(ctx.deadline().is_some());
//! assert!(ctx.err().is_none());
//!
//! root.cancel();
//! assert!(ctx.err().is_some());
//! # }
//! ```

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context, or one of its parents, was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Execution context carried through every client call.
///
/// Cloning is cheap and clones share cancellation. Children created with
/// [`Context::with_timeout`] or [`Context::with_deadline`] are cancelled with
/// their parent and never outlive the parent's deadline.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl Context {
    /// A context with no deadline that is only ended by [`Context::cancel`].
    pub fn background() -> Self {
        Self::default()
    }

    /// Child context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Child context that expires at `deadline`, or at the parent's deadline if
    /// that comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Context {
            deadline: Some(deadline),
            token: self.token.child_token(),
        }
    }

    /// Cancel this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The instant this context expires, if it has a deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Some` once the context has ended.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drive `future` until it completes or the context ends.
    ///
    /// The future is dropped as soon as the context ends, which aborts any
    /// in-flight request it owns.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ContextError::Cancelled),
            _ = expired => Err(ContextError::DeadlineExceeded),
            output = future => Ok(output),
        }
    }

    /// Sleep for `duration` unless the context ends first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        self.run(tokio::time::sleep(duration)).await
    }
}
